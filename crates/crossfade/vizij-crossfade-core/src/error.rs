//! Error types for the crossfade controller

use crate::graph::GraphError;

/// Errors surfaced by [`LayeredCrossfade`](crate::LayeredCrossfade) and its config.
///
/// A superseded request is not an error: older tasks end silently and are
/// reported as [`TaskStatus::Superseded`](crate::TaskStatus::Superseded).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CrossfadeError {
    /// Configuration values out of range
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Config could not be parsed
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    /// The animation graph was torn down; no further backend calls are made
    #[error("Animation graph unavailable")]
    BackendUnavailable,

    /// Backend call failed
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

impl CrossfadeError {
    /// Fatal errors leave the controller unusable.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable | Self::Graph(GraphError::Unavailable)
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "config",
            Self::Serialization { .. } => "serialization",
            Self::BackendUnavailable | Self::Graph(_) => "backend",
        }
    }
}

impl From<serde_json::Error> for CrossfadeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_backend_is_fatal() {
        assert!(CrossfadeError::BackendUnavailable.is_fatal());
        assert!(CrossfadeError::from(GraphError::Unavailable).is_fatal());
        assert!(!CrossfadeError::from(GraphError::UnknownNode).is_fatal());
    }

    #[test]
    fn categories() {
        let cfg = CrossfadeError::InvalidConfig {
            reason: "x".into(),
        };
        assert_eq!(cfg.category(), "config");
        let graph = CrossfadeError::from(GraphError::SlotOccupied { slot: 2 });
        assert_eq!(graph.category(), "backend");
        assert_eq!(graph.to_string(), "Graph error: layer 2 is already connected");
    }
}
