//! Raytracing error types

use thiserror::Error;

/// Result type for raytracing operations
pub type RaytraceResult<T> = Result<T, RaytraceError>;

/// Errors reported by model construction and ray tracing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaytraceError {
    /// The depth/velocity profile cannot be turned into a layered model
    #[error("Invalid velocity profile: {reason}")]
    InvalidProfile { reason: String },

    /// The ray source does not lie inside any layer of the model
    #[error("Source depth {depth} m is outside the model range [{top}, {bottom}] m")]
    SourceDepthOutOfRange { depth: f64, top: f64, bottom: f64 },

    /// Launch parameters that no ray can be traced from
    #[error("Invalid ray request: {reason}")]
    InvalidRequest { reason: String },

    /// The ray parameter exceeds the slowness of the medium at the ray position
    #[error(
        "Ray with slowness {slowness:e} s/m cannot propagate at velocity {velocity} m/s in layer {layer}"
    )]
    NonPropagatingRay {
        layer: usize,
        slowness: f64,
        velocity: f64,
    },

    /// The ray kept crossing layer faces without spending any travel time
    #[error("Ray stalled at depth {depth} m in layer {layer}")]
    StalledRay { layer: usize, depth: f64 },

    /// A layer step produced a non-finite time, offset or depth
    #[error("Non-finite ray step in layer {layer}")]
    NonFiniteStep { layer: usize },
}

impl RaytraceError {
    pub(crate) fn invalid_profile(reason: impl Into<String>) -> Self {
        RaytraceError::InvalidProfile {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        RaytraceError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Check if this error was raised by the numerical guards of a running trace
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            RaytraceError::NonPropagatingRay { .. }
                | RaytraceError::StalledRay { .. }
                | RaytraceError::NonFiniteStep { .. }
        )
    }
}
