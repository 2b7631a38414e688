use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_vizij_crossfade::{
    CrossfadeActor, CrossfadeCommand, CrossfadeFailed, CrossfadeFinished, VizijCrossfadePlugin,
};
use vizij_crossfade_core::{Clip, Config, CrossfadeError, RequestKind, TaskStatus};

#[derive(Resource, Default)]
struct Seen {
    finished: Vec<CrossfadeFinished>,
    failed: Vec<CrossfadeFailed>,
}

fn collect(
    mut finished: EventReader<CrossfadeFinished>,
    mut failed: EventReader<CrossfadeFailed>,
    mut seen: ResMut<Seen>,
) {
    seen.finished.extend(finished.read().cloned());
    seen.failed.extend(failed.read().cloned());
}

fn app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(VizijCrossfadePlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(50)))
        .init_resource::<Seen>()
        .add_systems(PostUpdate, collect);
    app
}

fn spawn_actor(app: &mut App) -> Entity {
    let actor = CrossfadeActor::new(Config::default()).unwrap();
    app.world_mut().spawn(actor).id()
}

#[test]
fn plugin_registers_events() {
    let app = app();
    assert!(app
        .world()
        .get_resource::<Events<CrossfadeCommand>>()
        .is_some());
    assert!(app
        .world()
        .get_resource::<Events<CrossfadeFinished>>()
        .is_some());
    assert!(app.world().get_resource::<Events<CrossfadeFailed>>().is_some());
}

#[test]
fn set_command_fades_clip_in_over_frames() {
    let mut app = app();
    let actor = spawn_actor(&mut app);

    app.world_mut().send_event(CrossfadeCommand::Set {
        actor,
        clip: Clip::new("wave", 2.0),
        mask: None,
        fade: Some(0.2),
    });

    for _ in 0..100 {
        app.update();
        if !app.world().resource::<Seen>().finished.is_empty() {
            break;
        }
    }

    let seen = app.world().resource::<Seen>();
    assert_eq!(seen.finished.len(), 1);
    assert_eq!(seen.finished[0].actor, actor);
    assert_eq!(seen.finished[0].outcome.kind, RequestKind::Set);
    assert_eq!(seen.finished[0].outcome.status, TaskStatus::Completed);
    assert!(seen.failed.is_empty());

    let cf = app.world().get::<CrossfadeActor>(actor).unwrap();
    assert_eq!(cf.0.current_index(), 1);
    assert_eq!(cf.0.overlay_weights().unwrap(), vec![1.0, 0.0, 0.0]);
}

#[test]
fn missing_fades_use_default_fade() {
    let mut app = app();
    let actor = spawn_actor(&mut app);

    app.world_mut().send_event(CrossfadeCommand::Play {
        actor,
        clip: Clip::new("bow", 1.0),
        mask: None,
        fade_in: None,
        fade_out: Some(0.0),
    });
    app.update();

    // 0.25s default fade-in: the request is still running after its first frame.
    let cf = app.world().get::<CrossfadeActor>(actor).unwrap();
    assert_eq!(cf.0.pending_tasks(), 1);
}

#[test]
fn commands_for_unknown_entities_are_ignored() {
    let mut app = app();
    let stray = app.world_mut().spawn_empty().id();

    app.world_mut().send_event(CrossfadeCommand::Reset {
        actor: stray,
        fade: None,
    });
    app.update();

    let seen = app.world().resource::<Seen>();
    assert!(seen.finished.is_empty());
    assert!(seen.failed.is_empty());
}

#[test]
fn lost_backend_is_reported_once() {
    let mut app = app();
    let actor = spawn_actor(&mut app);
    app.world_mut()
        .get_mut::<CrossfadeActor>(actor)
        .unwrap()
        .0
        .mixer_mut()
        .destroy_graph();

    app.world_mut().send_event(CrossfadeCommand::Set {
        actor,
        clip: Clip::new("wave", 2.0),
        mask: None,
        fade: None,
    });
    for _ in 0..5 {
        app.update();
    }

    let seen = app.world().resource::<Seen>();
    assert_eq!(seen.failed.len(), 1);
    assert_eq!(seen.failed[0].actor, actor);
    assert_eq!(seen.failed[0].error, CrossfadeError::BackendUnavailable);
    assert!(app
        .world()
        .get::<CrossfadeActor>(actor)
        .unwrap()
        .0
        .is_torn_down());
}
