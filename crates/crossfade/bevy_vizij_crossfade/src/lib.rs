//! Bevy plugin driving [`vizij_crossfade_core`] controllers from the frame loop.
//!
//! Spawn an entity with a [`CrossfadeActor`], send it [`CrossfadeCommand`]s and
//! listen for [`CrossfadeFinished`] / [`CrossfadeFailed`]. Commands are applied
//! before the tick each `Update`, so a request sent this frame starts this frame.

use bevy::prelude::*;
use vizij_crossfade_core::{BodyMask, Clip, CrossfadeError, TaskOutcome};

pub mod components;
pub mod systems;

pub use components::CrossfadeActor;
pub use systems::{apply_crossfade_commands, tick_crossfade_actors};

/// Request for one actor. `None` fades fall back to the actor's `default_fade`.
#[derive(Event, Clone, Debug)]
pub enum CrossfadeCommand {
    Set {
        actor: Entity,
        clip: Clip,
        mask: Option<BodyMask>,
        fade: Option<f32>,
    },
    Reset {
        actor: Entity,
        fade: Option<f32>,
    },
    Play {
        actor: Entity,
        clip: Clip,
        mask: Option<BodyMask>,
        fade_in: Option<f32>,
        fade_out: Option<f32>,
    },
}

impl CrossfadeCommand {
    pub fn actor(&self) -> Entity {
        match self {
            Self::Set { actor, .. } | Self::Reset { actor, .. } | Self::Play { actor, .. } => {
                *actor
            }
        }
    }
}

#[derive(Event, Clone, Debug)]
pub struct CrossfadeFinished {
    pub actor: Entity,
    pub outcome: TaskOutcome,
}

#[derive(Event, Clone, Debug)]
pub struct CrossfadeFailed {
    pub actor: Entity,
    pub error: CrossfadeError,
}

pub struct VizijCrossfadePlugin;

impl Plugin for VizijCrossfadePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<CrossfadeCommand>()
            .add_event::<CrossfadeFinished>()
            .add_event::<CrossfadeFailed>()
            .add_systems(
                Update,
                (apply_crossfade_commands, tick_crossfade_actors).chain(),
            );
    }
}
