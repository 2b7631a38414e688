//! Transition Engine: linear weight handoff between overlay layers.
//!
//! A transition snapshots the overlay weights when it begins and moves them
//! linearly toward a target distribution (1 on the target overlay, 0 on every
//! other one; all zero when the target is the base layer) over `duration`
//! seconds. The base layer stays at weight 1 throughout: overlays create the
//! blend by covering it through their masks.
//!
//! The engine never suspends on its own. Callers resume it once per tick with
//! [`Transition::step`] until it reports [`TransitionStatus::Finished`].

use crate::graph::{GraphError, LayerGraph};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransitionStatus {
    Running,
    /// Target weights were written exactly.
    Finished,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    target_index: usize,
    start_time: f64,
    duration: f32,
    /// Overlay weights at begin; element 0 is layer 1.
    initial: Vec<f32>,
    target: Vec<f32>,
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl Transition {
    /// Pin the base weight to 1 and snapshot the overlay weights.
    ///
    /// Overlays without a connected node count as weight 0. A non-positive or
    /// non-finite `duration` makes the transition snap on its first step.
    pub fn begin<G: LayerGraph>(
        graph: &mut G,
        overlay_count: usize,
        target_index: usize,
        now: f64,
        duration: f32,
    ) -> Result<Self, GraphError> {
        graph.set_layer_weight(0, 1.0)?;

        let mut initial = Vec::with_capacity(overlay_count);
        let mut target = Vec::with_capacity(overlay_count);
        for slot in 1..=overlay_count {
            let weight = if graph.is_connected(slot) {
                graph.layer_weight(slot)?
            } else {
                0.0
            };
            initial.push(weight);
            target.push(if slot == target_index { 1.0 } else { 0.0 });
        }

        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
        log::debug!("transition to layer {target_index} over {duration}s from {initial:?}");

        Ok(Self {
            target_index,
            start_time: now,
            duration,
            initial,
            target,
        })
    }

    #[inline]
    pub fn target_index(&self) -> usize {
        self.target_index
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[inline]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration as f64
    }

    pub fn initial_weights(&self) -> &[f32] {
        &self.initial
    }

    pub fn target_weights(&self) -> &[f32] {
        &self.target
    }

    /// Fraction of the duration still ahead of `now`, in [0, 1].
    fn remaining_fraction(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        let remaining = (self.end_time() - now) / self.duration as f64;
        (remaining as f32).clamp(0.0, 1.0)
    }

    /// Interpolated overlay weights at `now`, ignoring released layers.
    pub fn weights_at(&self, now: f64) -> Vec<f32> {
        let remaining = self.remaining_fraction(now);
        self.target
            .iter()
            .zip(&self.initial)
            .map(|(target, initial)| lerp(*target, *initial, remaining))
            .collect()
    }

    /// Write the weights for `now` into the graph.
    ///
    /// Once `now` reaches the end time the exact target weights are written
    /// and the transition reports `Finished`. Before that, layers whose node
    /// is no longer connected are forced to 0.
    pub fn step<G: LayerGraph>(
        &self,
        graph: &mut G,
        now: f64,
    ) -> Result<TransitionStatus, GraphError> {
        if self.duration <= 0.0 || now >= self.end_time() {
            for (offset, weight) in self.target.iter().enumerate() {
                graph.set_layer_weight(offset + 1, *weight)?;
            }
            log::debug!("transition to layer {} finished", self.target_index);
            return Ok(TransitionStatus::Finished);
        }

        let remaining = self.remaining_fraction(now);
        for (offset, (target, initial)) in self.target.iter().zip(&self.initial).enumerate() {
            let slot = offset + 1;
            let weight = if graph.is_connected(slot) {
                lerp(*target, *initial, remaining)
            } else {
                0.0
            };
            graph.set_layer_weight(slot, weight)?;
        }
        Ok(TransitionStatus::Running)
    }
}
