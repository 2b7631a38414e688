use bevy::prelude::*;

use crate::components::CrossfadeActor;
use crate::{CrossfadeCommand, CrossfadeFailed, CrossfadeFinished};

/// Forward queued commands to their actor's controller.
pub fn apply_crossfade_commands(
    mut commands: EventReader<CrossfadeCommand>,
    mut actors: Query<&mut CrossfadeActor>,
    mut failed: EventWriter<CrossfadeFailed>,
) {
    for command in commands.read() {
        let actor = command.actor();
        let Ok(mut cf) = actors.get_mut(actor) else {
            log::warn!("crossfade command for {actor:?} ignored: no CrossfadeActor");
            continue;
        };
        let default_fade = cf.0.config().default_fade;
        let result = match command {
            CrossfadeCommand::Set {
                clip, mask, fade, ..
            } => cf
                .0
                .set(clip, mask.as_ref(), fade.unwrap_or(default_fade))
                .map(|_| ()),
            CrossfadeCommand::Reset { fade, .. } => {
                cf.0.reset(fade.unwrap_or(default_fade)).map(|_| ())
            }
            CrossfadeCommand::Play {
                clip,
                mask,
                fade_in,
                fade_out,
                ..
            } => cf
                .0
                .play(
                    clip,
                    mask.as_ref(),
                    fade_in.unwrap_or(default_fade),
                    fade_out.unwrap_or(default_fade),
                )
                .map(|_| ()),
        };
        if let Err(error) = result {
            log::warn!(
                "crossfade command for {actor:?} failed ({}): {error}",
                error.category()
            );
            failed.send(CrossfadeFailed { actor, error });
        }
    }
}

/// Advance every live controller by the frame delta and report finished requests.
pub fn tick_crossfade_actors(
    time: Res<Time>,
    mut actors: Query<(Entity, &mut CrossfadeActor)>,
    mut finished: EventWriter<CrossfadeFinished>,
    mut failed: EventWriter<CrossfadeFailed>,
) {
    let dt = time.delta_seconds();
    for (actor, mut cf) in actors.iter_mut() {
        if cf.0.is_torn_down() {
            continue;
        }
        match cf.0.tick(dt) {
            Ok(outcomes) => {
                for outcome in outcomes {
                    finished.send(CrossfadeFinished { actor, outcome });
                }
            }
            Err(error) => {
                log::error!("crossfade tick for {actor:?} failed: {error}");
                failed.send(CrossfadeFailed { actor, error });
            }
        }
    }
}
