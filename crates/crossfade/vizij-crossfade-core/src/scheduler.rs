//! Cooperative scheduling primitives.
//!
//! Requests run as resumable tasks on the host's frame loop. A task advances
//! until it hits a suspension point (a running transition or a hold) and is
//! resumed on the next tick. Only one task runs at a time, so shared slot and
//! weight state needs no locking.

use serde::{Deserialize, Serialize};

use crate::generation::Generation;
use crate::ids::TaskId;
use crate::transition::Transition;

/// Level time in seconds, advanced by the host tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    now: f64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Negative or non-finite deltas leave the clock where it is.
    #[inline]
    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.now += dt as f64;
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Set,
    Reset,
    Play,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Ran to the end, cleanup included.
    Completed,
    /// A newer request took over; the task stopped without further mutation.
    Superseded,
}

/// Reported once per task when it leaves the scheduler.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task: TaskId,
    pub kind: RequestKind,
    pub generation: Generation,
    pub status: TaskStatus,
}

/// Remainder of a `play` request once its fade-in completes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct PlayTail {
    pub hold: f32,
    pub fade_out: f32,
}

/// Where a task is suspended.
#[derive(Clone, Debug)]
pub(crate) enum TaskState {
    /// Fading a freshly occupied overlay in; `from_index` is released afterwards.
    FadeIn {
        transition: Transition,
        from_index: usize,
        tail: Option<PlayTail>,
    },
    /// Waiting for level time to reach `until` before fading out.
    Hold { until: f64, fade_out: f32 },
    /// Fading every overlay out; all overlays are released afterwards.
    FadeOut { transition: Transition },
}

#[derive(Clone, Debug)]
pub(crate) struct Task {
    pub id: TaskId,
    pub kind: RequestKind,
    pub generation: Generation,
    pub state: TaskState,
}

impl Task {
    pub fn outcome(&self, status: TaskStatus) -> TaskOutcome {
        TaskOutcome {
            task: self.id,
            kind: self.kind,
            generation: self.generation,
            status,
        }
    }
}

/// Result of resuming a task once.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Poll {
    Pending,
    Finished(TaskStatus),
}
