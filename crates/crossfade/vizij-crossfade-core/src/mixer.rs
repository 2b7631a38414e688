//! In-memory layer mixer implementing [`LayerGraph`].
//!
//! `MixerGraph` keeps the bookkeeping an engine-side animation graph would:
//! a fixed number of inputs, each with an optional connected node, a blend
//! weight and an optional body-part mask. It does not evaluate poses; instead
//! [`MixerGraph::body_part_weights`] reports how much each connected input
//! contributes to a body part under override layering.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::graph::{ClipSource, GraphError, LayerGraph};
use crate::ids::{IdAllocator, NodeId};

/// Named clip with a fixed length in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    pub length: f32,
}

impl Clip {
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

impl ClipSource for Clip {
    #[inline]
    fn length(&self) -> f32 {
        self.length
    }
}

/// Humanoid body regions a mask can enable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Root,
    Body,
    Head,
    LeftLeg,
    RightLeg,
    LeftArm,
    RightArm,
    LeftFingers,
    RightFingers,
    LeftFootIk,
    RightFootIk,
    LeftHandIk,
    RightHandIk,
}

impl BodyPart {
    pub const ALL: [BodyPart; 13] = [
        BodyPart::Root,
        BodyPart::Body,
        BodyPart::Head,
        BodyPart::LeftLeg,
        BodyPart::RightLeg,
        BodyPart::LeftArm,
        BodyPart::RightArm,
        BodyPart::LeftFingers,
        BodyPart::RightFingers,
        BodyPart::LeftFootIk,
        BodyPart::RightFootIk,
        BodyPart::LeftHandIk,
        BodyPart::RightHandIk,
    ];

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of body parts a layer is allowed to affect.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BodyMask {
    bits: u16,
}

impl BodyMask {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Every humanoid part enabled, IK goals included.
    pub fn full_body() -> Self {
        BodyPart::ALL.into_iter().collect()
    }

    pub fn with(mut self, part: BodyPart) -> Self {
        self.set(part, true);
        self
    }

    pub fn set(&mut self, part: BodyPart, active: bool) {
        if active {
            self.bits |= part.bit();
        } else {
            self.bits &= !part.bit();
        }
    }

    #[inline]
    pub fn contains(&self, part: BodyPart) -> bool {
        self.bits & part.bit() != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn parts(&self) -> impl Iterator<Item = BodyPart> + '_ {
        BodyPart::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

impl FromIterator<BodyPart> for BodyMask {
    fn from_iter<I: IntoIterator<Item = BodyPart>>(iter: I) -> Self {
        let mut mask = BodyMask::empty();
        for part in iter {
            mask.set(part, true);
        }
        mask
    }
}

/// What a mixer node plays.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeSource {
    /// The actor's default animation source, connected to layer 0.
    Base { name: String },
    Clip(Clip),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MixerNode {
    pub id: NodeId,
    pub source: NodeSource,
    /// Input the node is connected to, if any.
    pub slot: Option<usize>,
}

#[derive(Clone, Debug, Default)]
struct MixerInput {
    node: Option<NodeId>,
    weight: f32,
    mask: Option<BodyMask>,
}

#[derive(Debug)]
pub struct MixerGraph {
    ids: IdAllocator,
    nodes: HashMap<NodeId, MixerNode>,
    inputs: Vec<MixerInput>,
    alive: bool,
    destroyed: usize,
}

impl MixerGraph {
    /// Create a mixer with `input_count` layer inputs, all empty and at weight 0.
    pub fn new(input_count: usize) -> Self {
        Self {
            ids: IdAllocator::new(),
            nodes: HashMap::new(),
            inputs: vec![MixerInput::default(); input_count],
            alive: true,
            destroyed: 0,
        }
    }

    /// Create the node standing for the actor's default animation source.
    pub fn create_base_node(&mut self, name: &str) -> Result<NodeId, GraphError> {
        self.insert_node(NodeSource::Base {
            name: name.to_string(),
        })
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Live (not yet destroyed) nodes, connected or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total nodes destroyed over the graph's lifetime.
    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    pub fn node(&self, id: NodeId) -> Option<&MixerNode> {
        self.nodes.get(&id)
    }

    pub fn input_node(&self, slot: usize) -> Option<NodeId> {
        self.inputs.get(slot).and_then(|i| i.node)
    }

    /// Clip played by the node connected to `slot`, if it is a clip node.
    pub fn input_clip(&self, slot: usize) -> Option<&Clip> {
        let node = self.input_node(slot)?;
        match &self.nodes.get(&node)?.source {
            NodeSource::Clip(clip) => Some(clip),
            NodeSource::Base { .. } => None,
        }
    }

    pub fn layer_mask(&self, slot: usize) -> Option<BodyMask> {
        self.inputs.get(slot).and_then(|i| i.mask)
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Tear the whole graph down. Every later call fails with [`GraphError::Unavailable`].
    pub fn destroy_graph(&mut self) {
        self.destroyed += self.nodes.len();
        self.nodes.clear();
        self.inputs.clear();
        self.alive = false;
    }

    /// Effective contribution of every connected input to `part`, bottom layer first.
    ///
    /// Layers composite in index order: a layer of weight `w` whose mask covers
    /// `part` takes `w` of the result and scales everything below it by `1 - w`.
    /// Inputs without a mask cover every part.
    pub fn body_part_weights(&self, part: BodyPart) -> Vec<(usize, f32)> {
        let mut out: Vec<(usize, f32)> = Vec::new();
        for (slot, input) in self.inputs.iter().enumerate() {
            if input.node.is_none() {
                continue;
            }
            let weight = input.weight.clamp(0.0, 1.0);
            let covered = input.mask.map_or(true, |m| m.contains(part));
            if weight <= 0.0 || !covered {
                continue;
            }
            for (_, below) in out.iter_mut() {
                *below *= 1.0 - weight;
            }
            out.push((slot, weight));
        }
        out
    }

    fn insert_node(&mut self, source: NodeSource) -> Result<NodeId, GraphError> {
        if !self.alive {
            return Err(GraphError::Unavailable);
        }
        let id = self.ids.alloc_node();
        self.nodes.insert(
            id,
            MixerNode {
                id,
                source,
                slot: None,
            },
        );
        Ok(id)
    }

    fn input_mut(&mut self, slot: usize) -> Result<&mut MixerInput, GraphError> {
        if !self.alive {
            return Err(GraphError::Unavailable);
        }
        let inputs = self.inputs.len();
        self.inputs
            .get_mut(slot)
            .ok_or(GraphError::SlotOutOfRange { slot, inputs })
    }
}

impl LayerGraph for MixerGraph {
    type Clip = Clip;
    type Mask = BodyMask;
    type Node = NodeId;

    fn create_node(&mut self, clip: &Clip) -> Result<NodeId, GraphError> {
        self.insert_node(NodeSource::Clip(clip.clone()))
    }

    fn connect(&mut self, node: &NodeId, slot: usize) -> Result<(), GraphError> {
        if self.input_mut(slot)?.node.is_some() {
            return Err(GraphError::SlotOccupied { slot });
        }
        let entry = self.nodes.get_mut(node).ok_or(GraphError::UnknownNode)?;
        if let Some(previous) = entry.slot {
            return Err(GraphError::SlotOccupied { slot: previous });
        }
        entry.slot = Some(slot);
        self.input_mut(slot)?.node = Some(*node);
        Ok(())
    }

    fn disconnect(&mut self, slot: usize) -> Result<(), GraphError> {
        if let Some(node) = self.input_mut(slot)?.node.take() {
            if let Some(entry) = self.nodes.get_mut(&node) {
                entry.slot = None;
            }
        }
        Ok(())
    }

    fn set_layer_weight(&mut self, slot: usize, weight: f32) -> Result<(), GraphError> {
        self.input_mut(slot)?.weight = weight.clamp(0.0, 1.0);
        Ok(())
    }

    fn layer_weight(&self, slot: usize) -> Result<f32, GraphError> {
        if !self.alive {
            return Err(GraphError::Unavailable);
        }
        self.inputs
            .get(slot)
            .map(|i| i.weight)
            .ok_or(GraphError::SlotOutOfRange {
                slot,
                inputs: self.inputs.len(),
            })
    }

    fn is_connected(&self, slot: usize) -> bool {
        self.alive && self.input_node(slot).is_some()
    }

    fn set_layer_mask(&mut self, slot: usize, mask: &BodyMask) -> Result<(), GraphError> {
        self.input_mut(slot)?.mask = Some(*mask);
        Ok(())
    }

    fn clear_layer_mask(&mut self, slot: usize) -> Result<(), GraphError> {
        self.input_mut(slot)?.mask = None;
        Ok(())
    }

    fn destroy(&mut self, node: &NodeId) -> Result<(), GraphError> {
        if !self.alive {
            return Err(GraphError::Unavailable);
        }
        let entry = self.nodes.remove(node).ok_or(GraphError::UnknownNode)?;
        if let Some(slot) = entry.slot {
            if let Some(input) = self.inputs.get_mut(slot) {
                input.node = None;
            }
        }
        self.destroyed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn full_body_mask_covers_every_part() {
        let mask = BodyMask::full_body();
        assert_eq!(mask.parts().count(), BodyPart::ALL.len());
        assert!(BodyPart::ALL.iter().all(|p| mask.contains(*p)));
    }

    #[test]
    fn mask_set_and_clear() {
        let mut mask = BodyMask::empty().with(BodyPart::Head);
        assert!(mask.contains(BodyPart::Head));
        assert!(!mask.contains(BodyPart::LeftArm));
        mask.set(BodyPart::Head, false);
        assert!(mask.is_empty());
    }

    #[test]
    fn connect_rejects_occupied_input() {
        let mut graph = MixerGraph::new(2);
        let a = graph.create_node(&Clip::new("a", 1.0)).unwrap();
        let b = graph.create_node(&Clip::new("b", 1.0)).unwrap();
        graph.connect(&a, 1).unwrap();
        assert_eq!(
            graph.connect(&b, 1),
            Err(GraphError::SlotOccupied { slot: 1 })
        );
        assert_eq!(
            graph.connect(&b, 5),
            Err(GraphError::SlotOutOfRange { slot: 5, inputs: 2 })
        );
    }

    #[test]
    fn destroy_disconnects_and_refuses_double_free() {
        let mut graph = MixerGraph::new(2);
        let a = graph.create_node(&Clip::new("a", 1.0)).unwrap();
        graph.connect(&a, 1).unwrap();
        assert!(graph.is_connected(1));
        assert_eq!(graph.input_clip(1).map(|c| c.name.as_str()), Some("a"));

        graph.destroy(&a).unwrap();
        assert!(!graph.is_connected(1));
        assert_eq!(graph.destroy(&a), Err(GraphError::UnknownNode));
        assert_eq!(graph.destroyed_count(), 1);
    }

    #[test]
    fn weights_are_clamped() {
        let mut graph = MixerGraph::new(1);
        graph.set_layer_weight(0, 1.5).unwrap();
        assert_eq!(graph.layer_weight(0).unwrap(), 1.0);
        graph.set_layer_weight(0, -0.5).unwrap();
        assert_eq!(graph.layer_weight(0).unwrap(), 0.0);
    }

    #[test]
    fn torn_down_graph_is_unavailable() {
        let mut graph = MixerGraph::new(2);
        let base = graph.create_base_node("animator").unwrap();
        graph.connect(&base, 0).unwrap();
        graph.destroy_graph();

        assert!(!graph.is_alive());
        assert!(!graph.is_connected(0));
        assert_eq!(graph.layer_weight(0), Err(GraphError::Unavailable));
        assert_eq!(
            graph.create_node(&Clip::new("a", 1.0)),
            Err(GraphError::Unavailable)
        );
    }

    #[test]
    fn body_part_weights_respect_masks() {
        let mut graph = MixerGraph::new(3);
        let base = graph.create_base_node("animator").unwrap();
        graph.connect(&base, 0).unwrap();
        graph.set_layer_weight(0, 1.0).unwrap();

        let wave = graph.create_node(&Clip::new("wave", 2.0)).unwrap();
        graph.connect(&wave, 1).unwrap();
        graph
            .set_layer_mask(1, &BodyMask::empty().with(BodyPart::RightArm))
            .unwrap();
        graph.set_layer_weight(1, 0.25).unwrap();

        let arm = graph.body_part_weights(BodyPart::RightArm);
        assert_eq!(arm.len(), 2);
        assert_abs_diff_eq!(arm[0].1, 0.75, epsilon = 1e-6);
        assert_eq!(arm[1].0, 1);
        assert_abs_diff_eq!(arm[1].1, 0.25, epsilon = 1e-6);

        let head = graph.body_part_weights(BodyPart::Head);
        assert_eq!(head, vec![(0, 1.0)]);
    }
}
