//! Backend interface consumed by the crossfade core.
//!
//! The animation backend evaluates clips into poses and mixes layers by weight
//! and body-part mask. The core only ever talks to it through [`LayerGraph`];
//! adapters (Bevy, custom engines) implement it. [`MixerGraph`](crate::MixerGraph)
//! is the in-memory implementation shipped with this crate.

use std::fmt::Debug;

/// A clip resource as seen by the core: only its fixed length matters.
pub trait ClipSource {
    /// Clip duration in seconds.
    fn length(&self) -> f32;
}

/// Layer mixer of a single actor. Layer 0 is the permanent base layer,
/// layers 1..=K are overlays.
pub trait LayerGraph {
    type Clip: ClipSource;
    type Mask: Clone + Debug;
    /// Playable node handle. Dead once [`LayerGraph::destroy`] succeeds.
    type Node: Debug;

    fn create_node(&mut self, clip: &Self::Clip) -> Result<Self::Node, GraphError>;
    fn connect(&mut self, node: &Self::Node, slot: usize) -> Result<(), GraphError>;
    fn disconnect(&mut self, slot: usize) -> Result<(), GraphError>;
    /// `weight` is in [0, 1].
    fn set_layer_weight(&mut self, slot: usize, weight: f32) -> Result<(), GraphError>;
    fn layer_weight(&self, slot: usize) -> Result<f32, GraphError>;
    /// Whether a live node is connected to `slot`. A torn-down graph reports false.
    fn is_connected(&self, slot: usize) -> bool;
    fn set_layer_mask(&mut self, slot: usize, mask: &Self::Mask) -> Result<(), GraphError>;
    fn clear_layer_mask(&mut self, slot: usize) -> Result<(), GraphError>;
    /// A failed destroy leaves the node alive, so the caller may retry.
    fn destroy(&mut self, node: &Self::Node) -> Result<(), GraphError>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("animation graph has been torn down")]
    Unavailable,

    #[error("layer {slot} is out of range (mixer has {inputs} inputs)")]
    SlotOutOfRange { slot: usize, inputs: usize },

    #[error("layer {slot} is already connected")]
    SlotOccupied { slot: usize },

    #[error("unknown node")]
    UnknownNode,

    #[error("backend error: {reason}")]
    Backend { reason: String },
}
