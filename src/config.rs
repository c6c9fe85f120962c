//! Monitor configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FenceError, FenceResult, ValidationError};

/// Default minimum movement (metres) before a tracked point is re-registered.
pub const DEFAULT_MOVEMENT_THRESHOLD_M: f64 = 2.0;

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Movements shorter than this do not update the engine's point geometry.
    pub movement_threshold_m: f64,
    /// Max queued shape-change events before they are coalesced.
    pub event_queue_capacity: usize,
    /// In history mode, an entity with no recorded state counts as previously
    /// outside. When false, first sightings never alert.
    pub treat_unknown_as_outside: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            movement_threshold_m: DEFAULT_MOVEMENT_THRESHOLD_M,
            event_queue_capacity: 64,
            treat_unknown_as_outside: true,
        }
    }
}

impl MonitorConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `FenceError::Config` for malformed JSON and
    /// `FenceError::Validation` for out-of-range values.
    pub fn from_json_str(json: &str) -> FenceResult<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| FenceError::Config {
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `FenceError::Config` if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> FenceResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| FenceError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_json_str(&text)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.movement_threshold_m.is_finite() || self.movement_threshold_m < 0.0 {
            return Err(ValidationError::InvalidConfig {
                field: "movement_threshold_m".to_string(),
                reason: format!("must be a finite value >= 0, got {}", self.movement_threshold_m),
            });
        }
        if self.event_queue_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                field: "event_queue_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
