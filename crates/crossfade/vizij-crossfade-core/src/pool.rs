//! Layer Pool: the fixed set of mixer layers of one actor.
//!
//! Slot 0 is the base layer. It holds the actor's default animation source for
//! the controller's whole lifetime and is never released here. Slots 1..=K are
//! overlays, each holding at most one clip node at a time.

use std::ops::RangeInclusive;

use crate::graph::{GraphError, LayerGraph};

/// One mixer layer and what currently occupies it.
#[derive(Debug)]
pub struct LayerSlot<N, M> {
    index: usize,
    occupant: Option<N>,
    mask: Option<M>,
}

impl<N, M> LayerSlot<N, M> {
    fn empty(index: usize) -> Self {
        Self {
            index,
            occupant: None,
            mask: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn occupant(&self) -> Option<&N> {
        self.occupant.as_ref()
    }

    /// Mask assigned with the current occupant. Always `None` for the base slot.
    pub fn mask(&self) -> Option<&M> {
        self.mask.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

#[derive(Debug)]
pub struct LayerPool<N, M> {
    slots: Vec<LayerSlot<N, M>>,
}

impl<N, M> LayerPool<N, M> {
    /// Build a pool around an already connected base node with `overlay_count`
    /// overlays. `overlay_count` must be at least 1 ([`Config::validate`]
    /// enforces this for the controller).
    ///
    /// [`Config::validate`]: crate::Config::validate
    pub fn new(base: N, overlay_count: usize) -> Self {
        debug_assert!(overlay_count > 0, "a layer pool needs at least one overlay");
        let mut slots = Vec::with_capacity(overlay_count + 1);
        slots.push(LayerSlot {
            index: 0,
            occupant: Some(base),
            mask: None,
        });
        slots.extend((1..=overlay_count).map(LayerSlot::empty));
        Self { slots }
    }

    /// K, the number of overlay slots.
    #[inline]
    pub fn overlay_count(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline]
    pub fn overlay_indices(&self) -> RangeInclusive<usize> {
        1..=self.overlay_count()
    }

    /// Slot to use for the next overlay: the one after `current_index`,
    /// wrapping from K back to 1.
    ///
    /// The slot may still hold content from two requests ago when requests
    /// arrive faster than fades complete; [`LayerPool::occupy`] replaces it.
    #[inline]
    pub fn allocate_overlay(&self, current_index: usize) -> usize {
        (current_index % self.overlay_count()) + 1
    }

    pub fn slot(&self, index: usize) -> Option<&LayerSlot<N, M>> {
        self.slots.get(index)
    }

    /// The actor's default animation source.
    pub fn base(&self) -> Option<&N> {
        self.slots[0].occupant.as_ref()
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.occupant.is_some())
    }

    pub fn occupied_overlays(&self) -> usize {
        self.slots[1..].iter().filter(|s| s.occupant.is_some()).count()
    }
}

impl<N, M: Clone> LayerPool<N, M> {
    /// Put a fresh node for `clip` into overlay `index`, releasing whatever was
    /// there. The layer keeps its weight at 0 until a transition raises it.
    pub fn occupy<G>(
        &mut self,
        graph: &mut G,
        index: usize,
        clip: &G::Clip,
        mask: M,
    ) -> Result<(), GraphError>
    where
        G: LayerGraph<Node = N, Mask = M>,
    {
        debug_assert!(self.overlay_indices().contains(&index));
        self.release(graph, index)?;

        graph.set_layer_mask(index, &mask)?;
        let node = graph.create_node(clip)?;
        if let Err(err) = graph.connect(&node, index) {
            // The node never became reachable from the pool.
            if let Err(destroy_err) = graph.destroy(&node) {
                log::warn!("overlay {index}: destroying unconnected node failed: {destroy_err}");
            }
            return Err(err);
        }
        log::debug!("overlay {index} occupied");

        let slot = &mut self.slots[index];
        slot.occupant = Some(node);
        slot.mask = Some(mask);
        Ok(())
    }

    /// Disconnect and destroy the occupant of overlay `index`, zero its weight
    /// and clear its mask. Returns false when the slot was already free. Slot 0
    /// is never released.
    ///
    /// The slot stays occupied until every backend call has succeeded, so a
    /// failed release can be retried.
    pub fn release<G>(&mut self, graph: &mut G, index: usize) -> Result<bool, GraphError>
    where
        G: LayerGraph<Node = N, Mask = M>,
    {
        if index == 0 {
            return Ok(false);
        }
        let Some(node) = self.slots.get(index).and_then(|s| s.occupant.as_ref()) else {
            return Ok(false);
        };

        graph.disconnect(index)?;
        graph.set_layer_weight(index, 0.0)?;
        graph.clear_layer_mask(index)?;
        graph.destroy(node)?;

        let slot = &mut self.slots[index];
        slot.occupant = None;
        slot.mask = None;
        log::debug!("overlay {index} released");
        Ok(true)
    }

    /// Release every overlay. Returns how many were occupied.
    pub fn release_all<G>(&mut self, graph: &mut G) -> Result<usize, GraphError>
    where
        G: LayerGraph<Node = N, Mask = M>,
    {
        let mut released = 0;
        for index in self.overlay_indices() {
            if self.release(graph, index)? {
                released += 1;
            }
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;
    use crate::mixer::{BodyMask, BodyPart, Clip, MixerGraph};

    fn pool_with_graph(overlays: usize) -> (LayerPool<NodeId, BodyMask>, MixerGraph) {
        let mut graph = MixerGraph::new(overlays + 1);
        let base = graph.create_base_node("animator").unwrap();
        graph.connect(&base, 0).unwrap();
        (LayerPool::new(base, overlays), graph)
    }

    #[test]
    fn allocation_round_robins_through_overlays() {
        let (pool, _) = pool_with_graph(3);
        assert_eq!(pool.allocate_overlay(0), 1);
        assert_eq!(pool.allocate_overlay(1), 2);
        assert_eq!(pool.allocate_overlay(2), 3);
        assert_eq!(pool.allocate_overlay(3), 1);
    }

    #[test]
    fn single_overlay_always_reuses_slot_one() {
        let (pool, _) = pool_with_graph(1);
        assert_eq!(pool.allocate_overlay(0), 1);
        assert_eq!(pool.allocate_overlay(1), 1);
    }

    #[test]
    fn occupy_replaces_previous_occupant() {
        let (mut pool, mut graph) = pool_with_graph(3);
        let arm = BodyMask::empty().with(BodyPart::LeftArm);
        pool.occupy(&mut graph, 2, &Clip::new("a", 1.0), arm).unwrap();
        graph.set_layer_weight(2, 0.6).unwrap();
        pool.occupy(&mut graph, 2, &Clip::new("b", 1.0), BodyMask::full_body())
            .unwrap();

        assert!(pool.is_occupied(2));
        assert_eq!(pool.slot(2).unwrap().mask(), Some(&BodyMask::full_body()));
        assert_eq!(graph.input_clip(2).unwrap().name, "b");
        assert_eq!(graph.layer_weight(2).unwrap(), 0.0);
        assert_eq!(graph.destroyed_count(), 1);
    }

    #[test]
    fn release_is_idempotent_and_spares_base() {
        let (mut pool, mut graph) = pool_with_graph(3);
        pool.occupy(&mut graph, 1, &Clip::new("a", 1.0), BodyMask::full_body())
            .unwrap();
        assert!(pool.release(&mut graph, 1).unwrap());
        assert!(!pool.release(&mut graph, 1).unwrap());
        assert!(!pool.release(&mut graph, 0).unwrap());

        assert!(pool.is_occupied(0));
        assert!(graph.is_connected(0));
        assert!(pool.slot(1).unwrap().is_free());
        assert!(pool.slot(1).unwrap().mask().is_none());
        assert_eq!(graph.layer_mask(1), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "at least one overlay")]
    fn pool_without_overlays_is_rejected() {
        let mut graph = MixerGraph::new(1);
        let base = graph.create_base_node("animator").unwrap();
        let _pool: LayerPool<NodeId, BodyMask> = LayerPool::new(base, 0);
    }

    #[test]
    fn release_all_counts_occupied_overlays() {
        let (mut pool, mut graph) = pool_with_graph(3);
        pool.occupy(&mut graph, 1, &Clip::new("a", 1.0), BodyMask::full_body())
            .unwrap();
        pool.occupy(&mut graph, 3, &Clip::new("c", 1.0), BodyMask::full_body())
            .unwrap();
        assert_eq!(pool.occupied_overlays(), 2);
        assert_eq!(pool.release_all(&mut graph).unwrap(), 2);
        assert_eq!(pool.occupied_overlays(), 0);
        assert_eq!(graph.node_count(), 1);
    }
}
