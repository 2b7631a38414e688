//! Controller configuration.

use serde::{Deserialize, Serialize};

use crate::error::CrossfadeError;

/// Upper bound on overlay layers per actor.
pub const MAX_OVERLAY_SLOTS: usize = 15;

/// Configuration for a [`LayeredCrossfade`](crate::LayeredCrossfade).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of transient overlay layers above the base layer (K).
    pub overlay_slots: usize,
    /// Fade time in seconds used by hosts when a request does not carry one.
    pub default_fade: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overlay_slots: 3,
            default_fade: 0.25,
        }
    }
}

impl Config {
    /// Parse a config from JSON. Missing fields take their default values.
    pub fn from_json_str(raw: &str) -> Result<Self, CrossfadeError> {
        let cfg: Config = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), CrossfadeError> {
        if self.overlay_slots == 0 || self.overlay_slots > MAX_OVERLAY_SLOTS {
            return Err(CrossfadeError::InvalidConfig {
                reason: format!(
                    "overlay_slots must be in 1..={MAX_OVERLAY_SLOTS}, got {}",
                    self.overlay_slots
                ),
            });
        }
        if !self.default_fade.is_finite() || self.default_fade < 0.0 {
            return Err(CrossfadeError::InvalidConfig {
                reason: format!(
                    "default_fade must be a finite, non-negative duration, got {}",
                    self.default_fade
                ),
            });
        }
        Ok(())
    }

    /// Mixer inputs required: the base layer plus every overlay.
    #[inline]
    pub fn mixer_inputs(&self) -> usize {
        self.overlay_slots + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_layout() {
        let cfg = Config::default();
        assert_eq!(cfg.overlay_slots, 3);
        assert_eq!(cfg.mixer_inputs(), 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = Config::from_json_str(r#"{ "overlay_slots": 2 }"#).unwrap();
        assert_eq!(cfg.overlay_slots, 2);
        assert_eq!(cfg.default_fade, Config::default().default_fade);
    }

    #[test]
    fn rejects_zero_overlays() {
        let err = Config::from_json_str(r#"{ "overlay_slots": 0 }"#).unwrap_err();
        assert!(matches!(err, CrossfadeError::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_negative_default_fade() {
        let cfg = Config {
            default_fade: -1.0,
            ..Config::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(CrossfadeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = Config::from_json_str("{ overlay_slots: }").unwrap_err();
        assert_eq!(err.category(), "serialization");
    }
}
