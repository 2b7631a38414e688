//! Request façade and per-tick driver.
//!
//! `LayeredCrossfade` owns the layer pool, the live generation counter and the
//! pending request tasks of one actor. Public requests (`set`, `reset`, `play`)
//! do their slot allocation synchronously, advance the generation, and launch a
//! task that runs up to its first suspension point before returning. The host
//! then calls [`LayeredCrossfade::tick`] once per frame.
//!
//! Cancellation is implicit: a task whose generation is no longer current stops
//! at its next resume without touching slots or weights.

use crate::config::Config;
use crate::error::CrossfadeError;
use crate::generation::{Generation, GenerationCounter};
use crate::graph::{ClipSource, GraphError, LayerGraph};
use crate::ids::{IdAllocator, TaskId};
use crate::pool::LayerPool;
use crate::scheduler::{
    Clock, PlayTail, Poll, RequestKind, Task, TaskOutcome, TaskState, TaskStatus,
};
use crate::transition::{Transition, TransitionStatus};

/// Handle returned for every launched request.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ticket {
    pub task: TaskId,
    pub kind: RequestKind,
    pub generation: Generation,
    /// Layer the request fades toward; 0 for `reset`.
    pub slot: usize,
}

/// Phase durations of a `play` request after fitting the fades into the clip.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlayPlan {
    pub fade_in: f32,
    pub hold: f32,
    pub fade_out: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlayTicket {
    pub ticket: Ticket,
    pub plan: PlayPlan,
}

#[inline]
fn non_negative(seconds: f32) -> f32 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

fn checked_fade(fade: f32, what: &str) -> f32 {
    let clean = non_negative(fade);
    if clean != fade && fade != 0.0 {
        log::warn!("{what} fade {fade} is not a valid duration; snapping instead");
    }
    clean
}

/// Shrink `fade_in` and `fade_out` so they fit into a clip of `length` seconds.
///
/// When their sum exceeds the clip length both are reduced by the surplus in
/// proportion to their share of the sum, so their ratio is kept and the hold
/// between them is never negative. Negative or non-finite inputs count as 0.
pub fn fit_fades(length: f32, fade_in: f32, fade_out: f32) -> (f32, f32) {
    let length = non_negative(length);
    let fade_in = non_negative(fade_in);
    let fade_out = non_negative(fade_out);

    let total = fade_in + fade_out;
    if total <= length {
        return (fade_in, fade_out);
    }
    let surplus = total - length;
    (
        (fade_in - surplus * (fade_in / total)).max(0.0),
        (fade_out - surplus * (fade_out / total)).max(0.0),
    )
}

/// Layered crossfade controller for a single actor.
#[derive(Debug)]
pub struct LayeredCrossfade<G: LayerGraph> {
    cfg: Config,
    graph: G,
    pool: LayerPool<G::Node, G::Mask>,
    default_mask: G::Mask,
    clock: Clock,
    /// 0 when no overlay is in the foreground, else the foreground overlay.
    current_index: usize,
    generation: GenerationCounter,
    ids: IdAllocator,
    tasks: Vec<Task>,
    outcomes: Vec<TaskOutcome>,
    torn_down: bool,
}

impl<G: LayerGraph> LayeredCrossfade<G> {
    /// Connect `base` (the actor's default animation source) to layer 0 at
    /// weight 1 and build the overlay pool. `default_mask` is used by requests
    /// that carry no mask.
    pub fn new(
        mut graph: G,
        base: G::Node,
        default_mask: G::Mask,
        cfg: Config,
    ) -> Result<Self, CrossfadeError> {
        cfg.validate()?;
        graph.connect(&base, 0)?;
        graph.set_layer_weight(0, 1.0)?;

        Ok(Self {
            pool: LayerPool::new(base, cfg.overlay_slots),
            cfg,
            graph,
            default_mask,
            clock: Clock::new(),
            current_index: 0,
            generation: GenerationCounter::new(),
            ids: IdAllocator::new(),
            tasks: Vec::new(),
            outcomes: Vec::new(),
            torn_down: false,
        })
    }

    /// Fade `clip` in on the next overlay, then release the overlay that was in
    /// the foreground before the call.
    pub fn set(
        &mut self,
        clip: &G::Clip,
        mask: Option<&G::Mask>,
        fade: f32,
    ) -> Result<Ticket, CrossfadeError> {
        self.ensure_live()?;
        let fade = checked_fade(fade, "set");
        let result = self.start_overlay(RequestKind::Set, clip, mask, fade, None);
        result.map_err(|err| self.recover(RequestKind::Set, fade, err))
    }

    /// Fade every overlay out to the base layer, then release all overlays.
    pub fn reset(&mut self, fade: f32) -> Result<Ticket, CrossfadeError> {
        self.ensure_live()?;
        let fade = checked_fade(fade, "reset");
        let result = self.start_reset(fade);
        result.map_err(|err| self.recover(RequestKind::Reset, fade, err))
    }

    /// Fade `clip` in, hold it for the rest of its length, and fade back to base.
    pub fn play(
        &mut self,
        clip: &G::Clip,
        mask: Option<&G::Mask>,
        fade_in: f32,
        fade_out: f32,
    ) -> Result<PlayTicket, CrossfadeError> {
        self.ensure_live()?;
        let length = non_negative(clip.length());
        let requested = (
            checked_fade(fade_in, "play fade-in"),
            checked_fade(fade_out, "play fade-out"),
        );
        let (fade_in, fade_out) = fit_fades(length, requested.0, requested.1);
        if (fade_in, fade_out) != requested {
            log::warn!(
                "fades {:?} exceed clip length {length}; shrunk to ({fade_in}, {fade_out})",
                requested
            );
        }
        let plan = PlayPlan {
            fade_in,
            hold: (length - fade_in - fade_out).max(0.0),
            fade_out,
        };
        let tail = PlayTail {
            hold: plan.hold,
            fade_out: plan.fade_out,
        };

        let result = self.start_overlay(RequestKind::Play, clip, mask, plan.fade_in, Some(tail));
        let ticket = result.map_err(|err| self.recover(RequestKind::Play, plan.fade_in, err))?;
        Ok(PlayTicket { ticket, plan })
    }

    /// Advance level time by `dt` seconds and resume every pending task once.
    ///
    /// Returns the outcomes of tasks that finished since the previous tick,
    /// including ones that finished while being launched. A backend error ends
    /// the task that hit it and is returned; a settling task over
    /// `default_fade` takes its place. If the backend is gone, every pending
    /// task is dropped and later calls fail with `BackendUnavailable`.
    pub fn tick(&mut self, dt: f32) -> Result<Vec<TaskOutcome>, CrossfadeError> {
        self.ensure_live()?;
        self.clock.advance(dt);

        let mut failure = None;
        for mut task in std::mem::take(&mut self.tasks) {
            if failure.is_some() {
                self.tasks.push(task);
                continue;
            }
            match self.resume(&mut task) {
                Ok(Poll::Pending) => self.tasks.push(task),
                Ok(Poll::Finished(status)) => self.outcomes.push(task.outcome(status)),
                Err(err) => {
                    log::error!("{:?} request {:?} failed: {err}", task.kind, task.id);
                    failure = Some((task.kind, err));
                }
            }
        }

        if let Some((kind, err)) = failure {
            let fade = self.cfg.default_fade;
            return Err(self.recover(kind, fade, err));
        }
        Ok(std::mem::take(&mut self.outcomes))
    }

    /// Release every overlay and cancel pending work. The controller refuses
    /// requests afterwards; the base layer is left to the owner of the graph.
    pub fn teardown(&mut self) -> Result<(), CrossfadeError> {
        if self.torn_down {
            return Ok(());
        }
        self.generation.advance();
        self.tasks.clear();
        self.current_index = 0;
        let released = self.pool.release_all(&mut self.graph);
        self.torn_down = true;
        match released {
            Ok(_) | Err(GraphError::Unavailable) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Hand the backend back, e.g. after [`LayeredCrossfade::teardown`].
    pub fn into_mixer(self) -> G {
        self.graph
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The underlying mixer, for callers composing on top of it.
    #[inline]
    pub fn mixer(&self) -> &G {
        &self.graph
    }

    #[inline]
    pub fn mixer_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation.current()
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn pool(&self) -> &LayerPool<G::Node, G::Mask> {
        &self.pool
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn default_mask(&self) -> &G::Mask {
        &self.default_mask
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// No task is waiting on a transition or a hold.
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Current weight of each overlay; element 0 is layer 1.
    pub fn overlay_weights(&self) -> Result<Vec<f32>, CrossfadeError> {
        self.ensure_live()?;
        self.pool
            .overlay_indices()
            .map(|slot| self.graph.layer_weight(slot).map_err(CrossfadeError::from))
            .collect()
    }

    fn ensure_live(&self) -> Result<(), CrossfadeError> {
        if self.torn_down {
            return Err(CrossfadeError::BackendUnavailable);
        }
        Ok(())
    }

    /// A lost backend poisons the controller; anything else only fails the call.
    fn escalate(&mut self, err: CrossfadeError) -> CrossfadeError {
        if !err.is_fatal() {
            return err;
        }
        log::error!(
            "animation graph unavailable; dropping {} pending task(s)",
            self.tasks.len()
        );
        self.torn_down = true;
        self.tasks.clear();
        CrossfadeError::BackendUnavailable
    }

    /// Handle a request or task that failed after the generation moved on.
    ///
    /// Every older task is already superseded, so unless the backend is gone a
    /// settling task under the current generation drives the weights back to a
    /// rest state: onto the current overlay if it still holds a clip, else onto
    /// the base layer. Returns the original error unless settling lost the backend.
    fn recover(&mut self, kind: RequestKind, fade: f32, err: CrossfadeError) -> CrossfadeError {
        let err = self.escalate(err);
        if err.is_fatal() {
            return err;
        }
        if let Err(settle_err) = self.start_settle(kind, fade) {
            log::error!("{kind:?} request could not settle after failing: {settle_err}");
            let settle_err = self.escalate(settle_err);
            if settle_err.is_fatal() {
                return settle_err;
            }
        }
        err
    }

    fn start_settle(&mut self, kind: RequestKind, fade: f32) -> Result<Ticket, CrossfadeError> {
        let generation = self.generation.current();
        let target = match self.current_index {
            0 => 0,
            index if self.pool.is_occupied(index) => index,
            _ => 0,
        };
        self.current_index = target;

        let transition = Transition::begin(
            &mut self.graph,
            self.pool.overlay_count(),
            target,
            self.clock.now(),
            fade,
        )?;
        let state = if target == 0 {
            TaskState::FadeOut { transition }
        } else {
            TaskState::FadeIn {
                transition,
                from_index: target,
                tail: None,
            }
        };
        let task = Task {
            id: self.ids.alloc_task(),
            kind,
            generation,
            state,
        };
        log::warn!(
            "{kind:?} request failed; {:?} settles on layer {target}",
            task.id
        );
        self.launch(task, target)
    }

    fn start_overlay(
        &mut self,
        kind: RequestKind,
        clip: &G::Clip,
        mask: Option<&G::Mask>,
        fade: f32,
        tail: Option<PlayTail>,
    ) -> Result<Ticket, CrossfadeError> {
        let generation = self.generation.advance();
        let from_index = self.current_index;
        let to_index = self.pool.allocate_overlay(from_index);
        let mask = mask.unwrap_or(&self.default_mask).clone();

        self.pool.occupy(&mut self.graph, to_index, clip, mask)?;
        self.current_index = to_index;

        let transition = Transition::begin(
            &mut self.graph,
            self.pool.overlay_count(),
            to_index,
            self.clock.now(),
            fade,
        )?;
        let task = Task {
            id: self.ids.alloc_task(),
            kind,
            generation,
            state: TaskState::FadeIn {
                transition,
                from_index,
                tail,
            },
        };
        log::debug!(
            "{kind:?} request {:?} ({generation:?}): layer {from_index} -> {to_index}",
            task.id
        );
        self.launch(task, to_index)
    }

    fn start_reset(&mut self, fade: f32) -> Result<Ticket, CrossfadeError> {
        // Take the generation before touching shared state so an in-flight
        // request can no longer clean up after this point.
        let generation = self.generation.advance();
        let from_index = self.current_index;
        self.current_index = 0;

        let transition = Transition::begin(
            &mut self.graph,
            self.pool.overlay_count(),
            0,
            self.clock.now(),
            fade,
        )?;
        let task = Task {
            id: self.ids.alloc_task(),
            kind: RequestKind::Reset,
            generation,
            state: TaskState::FadeOut { transition },
        };
        log::debug!(
            "Reset request {:?} ({generation:?}): layer {from_index} -> 0",
            task.id
        );
        self.launch(task, 0)
    }

    /// Run a new task up to its first suspension point.
    fn launch(&mut self, mut task: Task, slot: usize) -> Result<Ticket, CrossfadeError> {
        let ticket = Ticket {
            task: task.id,
            kind: task.kind,
            generation: task.generation,
            slot,
        };
        match self.resume(&mut task)? {
            Poll::Pending => self.tasks.push(task),
            Poll::Finished(status) => self.outcomes.push(task.outcome(status)),
        }
        Ok(ticket)
    }

    fn resume(&mut self, task: &mut Task) -> Result<Poll, CrossfadeError> {
        loop {
            if !self.generation.is_current(task.generation) {
                log::debug!("{:?} request {:?} superseded", task.kind, task.id);
                return Ok(Poll::Finished(TaskStatus::Superseded));
            }

            let now = self.clock.now();
            let next = match &mut task.state {
                TaskState::FadeIn {
                    transition,
                    from_index,
                    tail,
                } => {
                    if transition.step(&mut self.graph, now)? == TransitionStatus::Running {
                        return Ok(Poll::Pending);
                    }
                    // With a single overlay the new clip reuses the previous slot.
                    let from = *from_index;
                    if from != 0 && from != transition.target_index() {
                        self.pool.release(&mut self.graph, from)?;
                    }
                    match tail.take() {
                        Some(tail) => TaskState::Hold {
                            until: now + tail.hold as f64,
                            fade_out: tail.fade_out,
                        },
                        None => return Ok(Poll::Finished(TaskStatus::Completed)),
                    }
                }
                TaskState::Hold { until, fade_out } => {
                    if now < *until {
                        return Ok(Poll::Pending);
                    }
                    self.current_index = 0;
                    let transition = Transition::begin(
                        &mut self.graph,
                        self.pool.overlay_count(),
                        0,
                        now,
                        *fade_out,
                    )?;
                    TaskState::FadeOut { transition }
                }
                TaskState::FadeOut { transition } => {
                    if transition.step(&mut self.graph, now)? == TransitionStatus::Running {
                        return Ok(Poll::Pending);
                    }
                    let released = self.pool.release_all(&mut self.graph)?;
                    log::debug!(
                        "{:?} request {:?} back on base, {released} overlay(s) released",
                        task.kind,
                        task.id
                    );
                    return Ok(Poll::Finished(TaskStatus::Completed));
                }
            };
            task.state = next;
        }
    }
}
