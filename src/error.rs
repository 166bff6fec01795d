//! Error types for palm-nebula.
//!
//! Very little in the simulation can fail: out-of-range parameters are
//! clamped, lost hands are frozen, and degenerate geometry falls back to safe
//! defaults. The types here cover the remaining cases: name-based parameter
//! binding, parsing handedness labels, and the finiteness check used by tests
//! and debug tooling.

use std::fmt;

/// Errors that can occur when setting a parameter by name.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// No parameter with this name exists.
    Unknown(String),
    /// The value is NaN or infinite.
    NonFinite {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::Unknown(name) => write!(f, "Unknown nebula parameter: {}", name),
            ParamError::NonFinite { name, value } => {
                write!(f, "Parameter {} must be finite, got {}", name, value)
            }
        }
    }
}

impl std::error::Error for ParamError {}

/// Errors reported by the simulation itself.
#[derive(Debug, Clone, PartialEq)]
pub enum NebulaError {
    /// A NaN or infinite value reached a particle buffer.
    NonFinite {
        /// Hand slot owning the cloud.
        slot: usize,
        /// Particle index inside the cloud.
        particle: usize,
    },
    /// A handedness label could not be parsed.
    InvalidHandedness(String),
    /// Parameter binding failed.
    Param(ParamError),
}

impl fmt::Display for NebulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NebulaError::NonFinite { slot, particle } => write!(
                f,
                "Non-finite particle state in hand slot {} (particle {})",
                slot, particle
            ),
            NebulaError::InvalidHandedness(label) => {
                write!(f, "Invalid handedness label: {:?}", label)
            }
            NebulaError::Param(e) => write!(f, "Parameter error: {}", e),
        }
    }
}

impl std::error::Error for NebulaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NebulaError::Param(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParamError> for NebulaError {
    fn from(e: ParamError) -> Self {
        NebulaError::Param(e)
    }
}
