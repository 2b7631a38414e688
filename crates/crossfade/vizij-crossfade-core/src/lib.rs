//! Vizij Crossfade Core (engine-agnostic)
//!
//! Drives layered, time-bounded crossfades between animation clips on a single
//! skeletal actor. The animation backend (clip evaluation, pose mixing by weight
//! and mask) sits behind the [`LayerGraph`] trait; this crate owns the policy on
//! top of it:
//! - which clip occupies which overlay layer ([`LayerPool`])
//! - how layer weights evolve over time ([`Transition`])
//! - how a newer request supersedes an in-flight one ([`GenerationCounter`])
//! - the public `set` / `reset` / `play` requests ([`LayeredCrossfade`])
//!
//! Work is cooperative: requests launch tasks that are resumed once per host
//! tick via [`LayeredCrossfade::tick`].

pub mod config;
pub mod controller;
pub mod error;
pub mod generation;
pub mod graph;
pub mod ids;
pub mod mixer;
pub mod pool;
pub mod scheduler;
pub mod transition;

// Re-exports for consumers (adapters)
pub use config::Config;
pub use controller::{fit_fades, LayeredCrossfade, PlayPlan, PlayTicket, Ticket};
pub use error::CrossfadeError;
pub use generation::{Generation, GenerationCounter};
pub use graph::{ClipSource, GraphError, LayerGraph};
pub use ids::{NodeId, TaskId};
pub use mixer::{BodyMask, BodyPart, Clip, MixerGraph};
pub use pool::{LayerPool, LayerSlot};
pub use scheduler::{Clock, RequestKind, TaskOutcome, TaskStatus};
pub use transition::{Transition, TransitionStatus};
