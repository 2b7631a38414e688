use bevy::prelude::*;
use vizij_crossfade_core::{BodyMask, Config, CrossfadeError, LayeredCrossfade, MixerGraph};

/// Crossfade controller attached to an actor entity.
#[derive(Component, Debug)]
pub struct CrossfadeActor(pub LayeredCrossfade<MixerGraph>);

impl CrossfadeActor {
    /// Build a mixer sized for `cfg` with the animator output on layer 0.
    /// Requests without a mask affect the full body.
    pub fn new(cfg: Config) -> Result<Self, CrossfadeError> {
        let mut graph = MixerGraph::new(cfg.mixer_inputs());
        let base = graph.create_base_node("animator")?;
        LayeredCrossfade::new(graph, base, BodyMask::full_body(), cfg).map(Self)
    }
}
