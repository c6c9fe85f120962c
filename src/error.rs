//! Error types for KyroFence.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions. Note that the monitoring loop itself never surfaces
//! these to the caller of `check`; they are absorbed and logged there.

use thiserror::Error;

use crate::engine::GeometryHandle;
use crate::entity::EntityId;

/// Validation errors that occur during input validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Latitude {value} is out of range [-90.0, 90.0]")]
    LatitudeOutOfRange { value: f64 },

    #[error("Longitude {value} is out of range [-180.0, 180.0]")]
    LongitudeOutOfRange { value: f64 },

    #[error("Fence needs at least {required} points, got {actual}")]
    TooFewPoints { required: usize, actual: usize },

    #[error("Fence shape is not closed")]
    ShapeNotClosed,

    #[error("Invalid elevation range: min ({min}) must not exceed max ({max})")]
    InvalidElevationRange { min: f64, max: f64 },

    #[error("Invalid configuration '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },
}

/// Errors raised by a spatial engine backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// The engine refused the geometry (ordinary failure; no handle produced).
    #[error("Geometry rejected: {reason}")]
    Rejected { reason: String },

    /// The handle does not name a stored geometry.
    #[error("Unknown geometry handle: {handle}")]
    UnknownHandle { handle: GeometryHandle },

    /// The handle names a geometry of the wrong kind.
    #[error("Geometry {handle} is not a {expected}")]
    WrongKind {
        handle: GeometryHandle,
        expected: &'static str,
    },

    /// Severe storage failure (underlying corruption, poisoned lock, ...).
    #[error("Spatial storage failure: {message}")]
    Storage { message: String },
}

impl EngineError {
    /// Creates a storage failure.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a rejection.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// The handle an unknown-handle or wrong-kind error refers to.
    #[must_use]
    pub const fn handle(&self) -> Option<GeometryHandle> {
        match self {
            Self::UnknownHandle { handle } | Self::WrongKind { handle, .. } => Some(*handle),
            Self::Rejected { .. } | Self::Storage { .. } => None,
        }
    }

    /// Returns true for failures of the backing storage itself.
    #[must_use]
    pub const fn is_severe(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

/// Top-level error type for KyroFence.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FenceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Entity {id} has no current location")]
    MissingLocation { id: EntityId },

    #[error("Configuration could not be loaded: {message}")]
    Config { message: String },
}

impl FenceError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an engine error.
    #[must_use]
    pub const fn is_engine(&self) -> bool {
        matches!(self, Self::Engine(_))
    }

    /// Returns true if this error came from a severe engine storage failure.
    #[must_use]
    pub const fn is_severe(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_severe(),
            _ => false,
        }
    }
}

/// Result type alias for KyroFence operations.
pub type FenceResult<T> = Result<T, FenceError>;
