//! Ray tracing through a layered velocity model.
//!
//! A trace starts at the source, walks layer by layer until the time budget is
//! spent or the ray leaves the model, and reports where it ended up.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_STALLED_STEPS_PER_LAYER;
use crate::error::{RaytraceError, RaytraceResult};
use crate::layer_integrator::{LayerPath, LayerStep};
use crate::path_recorder::{record_step, PathSink};
use crate::ray_state::{RayState, RayStatus, SsvMode};
use crate::velocity_model::VelocityModel;

/// Launch parameters for one ray
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayRequest {
    /// Depth of the source (m)
    pub source_depth: f64,
    /// Angle from the downward vertical (degrees); the sign selects the
    /// horizontal direction and magnitudes above 90 launch upward
    pub launch_angle_deg: f64,
    /// Travel time budget (s)
    pub max_time: f64,
    pub ssv_mode: SsvMode,
    /// Surface sound velocity used by the transducer (m/s)
    pub surface_velocity: f64,
    /// Steering null angle of the receiver (degrees)
    pub null_angle_deg: f64,
}

impl Default for RayRequest {
    fn default() -> Self {
        Self {
            source_depth: 0.0,
            launch_angle_deg: 0.0,
            max_time: 1.0,
            ssv_mode: SsvMode::Ignore,
            surface_velocity: 0.0,
            null_angle_deg: 0.0,
        }
    }
}

impl RayRequest {
    fn validate(&self) -> RaytraceResult<()> {
        if !self.source_depth.is_finite() {
            return Err(RaytraceError::invalid_request(format!(
                "source depth {} is not finite",
                self.source_depth
            )));
        }
        if !self.launch_angle_deg.is_finite() || self.launch_angle_deg.abs() > 180.0 {
            return Err(RaytraceError::invalid_request(format!(
                "launch angle {} deg is outside [-180, 180]",
                self.launch_angle_deg
            )));
        }
        if !self.max_time.is_finite() || self.max_time < 0.0 {
            return Err(RaytraceError::invalid_request(format!(
                "travel time {} s must be finite and non-negative",
                self.max_time
            )));
        }
        if !self.surface_velocity.is_finite() || !self.null_angle_deg.is_finite() {
            return Err(RaytraceError::invalid_request(
                "surface velocity correction inputs must be finite",
            ));
        }
        Ok(())
    }
}

/// Where a ray ended up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    /// Horizontal offset from the source, signed by the launch direction (m)
    pub offset: f64,
    pub depth: f64,
    /// Time actually travelled; less than the budget when the ray left the model
    pub elapsed_time: f64,
    pub status: RayStatus,
}

impl TraceResult {
    fn from_state(state: &RayState) -> Self {
        Self {
            offset: state.direction * state.offset,
            depth: state.depth,
            elapsed_time: state.elapsed,
            status: state.status,
        }
    }
}

/// Trace one ray, optionally recording its path.
///
/// The source point is recorded first, then the end of every layer step (and
/// intermediate arc samples in [`crate::RecordMode::Full`]).
pub fn trace(
    model: &VelocityModel,
    request: &RayRequest,
    mut path: Option<&mut dyn PathSink>,
) -> RaytraceResult<TraceResult> {
    request.validate()?;
    let mut state = RayState::launch(model, request)?;
    let layers = model.layers();
    state.ensure_propagating(&layers[state.layer])?;

    tracing::debug!(
        source_depth = request.source_depth,
        angle = request.launch_angle_deg,
        max_time = request.max_time,
        layer = state.layer,
        slowness = state.slowness,
        "starting trace"
    );

    if let Some(sink) = path.as_deref_mut() {
        sink.append(state.point());
    }

    let stall_limit = MAX_STALLED_STEPS_PER_LAYER * layers.len();
    let mut stalled = 0;
    let mut bounced = false;
    while !state.finished && state.remaining > 0.0 {
        let layer = &layers[state.layer];

        // A ray can only be blocked right after crossing a face: it turns
        // back through that face
        let strategy = LayerPath::select(layer, state.slowness, state.heading());
        let mut step = if state.is_blocked(layer) {
            LayerStep::reflection(&state)
        } else {
            strategy.advance(layer, &state)
        };
        step.ensure_finite(state.layer)?;

        // Bouncing off both sides of a face without spending time: the ray
        // is trapped on a velocity minimum and runs along it
        if step.is_instant_turn() {
            if bounced {
                step = LayerStep::along_face(layer, &state);
            }
            bounced = true;
        } else {
            bounced = false;
        }

        stalled = if step.dt == 0.0 { stalled + 1 } else { 0 };
        if stalled > stall_limit {
            tracing::warn!(layer = state.layer, depth = state.depth, "ray stalled");
            return Err(RaytraceError::StalledRay {
                layer: state.layer,
                depth: state.depth,
            });
        }

        tracing::trace!(
            layer = state.layer,
            ?strategy,
            dt = step.dt,
            offset = step.offset,
            depth = step.depth,
            outcome = ?step.outcome,
            "layer step"
        );

        if let Some(sink) = path.as_deref_mut() {
            record_step(sink, &state, &step);
        }
        state.advance(&step, layers.len());
    }

    let result = TraceResult::from_state(&state);
    tracing::debug!(
        offset = result.offset,
        depth = result.depth,
        elapsed = result.elapsed_time,
        status = %result.status,
        "finished trace"
    );
    Ok(result)
}

impl VelocityModel {
    /// Trace one ray without recording its path
    pub fn trace(&self, request: &RayRequest) -> RaytraceResult<TraceResult> {
        trace(self, request, None)
    }
}
