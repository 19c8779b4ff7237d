//! One step of a ray through a single layer.
//!
//! A step either ends on a layer face or where the remaining time budget runs
//! out. Straight paths are used in homogeneous layers and for steep rays in
//! gradient layers; everything else goes through [`crate::circular_arc`].

use crate::circular_arc::{trace_arc, ArcGeometry, ArcQuadrant};
use crate::constants::NEAR_VERTICAL_SINE;
use crate::error::{RaytraceError, RaytraceResult};
use crate::ray_state::{Heading, RayState};
use crate::velocity_model::{Boundary, Layer, LayerMode};

/// How a layer step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Reached a layer face with time left
    Exited(Boundary),
    /// Ran out of time inside the layer
    Exhausted,
}

/// Result of integrating one layer. `offset` is unsigned, along the launch direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStep {
    pub dt: f64,
    pub offset: f64,
    pub depth: f64,
    pub outcome: StepOutcome,
    /// New heading when the ray turned during the step
    pub turn: Option<Heading>,
    /// Circle followed during the step, for arc paths
    pub arc: Option<ArcGeometry>,
}

impl LayerStep {
    /// Reject steps with NaN or infinite components
    pub fn ensure_finite(&self, layer: usize) -> RaytraceResult<()> {
        if self.dt.is_finite() && self.offset.is_finite() && self.depth.is_finite() {
            return Ok(());
        }
        tracing::warn!(
            layer,
            dt = self.dt,
            offset = self.offset,
            depth = self.depth,
            "non-finite layer step"
        );
        Err(RaytraceError::NonFiniteStep { layer })
    }

    /// Zero-time reversal at the face the ray just came through, for a ray
    /// that cannot enter the layer it is in
    pub fn reflection(state: &RayState) -> Self {
        let heading = state.heading();
        LayerStep {
            dt: 0.0,
            offset: state.offset,
            depth: state.depth,
            outcome: StepOutcome::Exited(heading.boundary_ahead().opposite()),
            turn: Some(heading.reversed()),
            arc: None,
        }
    }

    /// Horizontal run along the current depth for the rest of the budget
    pub fn along_face(layer: &Layer, state: &RayState) -> Self {
        let velocity = layer.ray_velocity(state.depth);
        LayerStep {
            dt: state.remaining,
            offset: state.offset + velocity * state.remaining,
            depth: state.depth,
            outcome: StepOutcome::Exhausted,
            turn: None,
            arc: None,
        }
    }

    /// A turn that took no time, i.e. the ray bounced off the face it sits on
    pub fn is_instant_turn(&self) -> bool {
        self.dt == 0.0 && self.turn.is_some()
    }
}

/// Integration strategy for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPath {
    Line,
    Vertical,
    Arc(ArcQuadrant),
}

impl LayerPath {
    pub fn select(layer: &Layer, slowness: f64, heading: Heading) -> Self {
        match layer.mode {
            LayerMode::Homogeneous => LayerPath::Line,
            LayerMode::Gradient if slowness * layer.max_velocity() < NEAR_VERTICAL_SINE => {
                LayerPath::Vertical
            }
            LayerMode::Gradient => LayerPath::Arc(ArcQuadrant::classify(heading, layer.gradient)),
        }
    }

    pub fn advance(self, layer: &Layer, state: &RayState) -> LayerStep {
        match self {
            LayerPath::Line => trace_line(layer, state),
            LayerPath::Vertical => trace_vertical(layer, state),
            LayerPath::Arc(quadrant) => trace_arc(layer, state, quadrant),
        }
    }
}

/// Straight path at the layer's top velocity
fn trace_line(layer: &Layer, state: &RayState) -> LayerStep {
    let velocity = layer.velocity_top;
    // Within the grazing tolerance p v may round a hair above one
    let sine = (state.slowness * velocity).min(1.0);
    let horizontal = velocity * sine;
    let heading = state.heading();
    let vertical = match heading {
        Heading::Down => velocity * (1.0 - sine * sine).sqrt(),
        Heading::Up => -velocity * (1.0 - sine * sine).sqrt(),
    };

    let boundary = heading.boundary_ahead();
    let target = layer.boundary_depth(boundary);
    let to_exit = if vertical != 0.0 {
        (target - state.depth) / vertical
    } else {
        f64::INFINITY
    };

    if to_exit >= state.remaining {
        let dt = state.remaining;
        LayerStep {
            dt,
            offset: state.offset + horizontal * dt,
            depth: state.depth + vertical * dt,
            outcome: StepOutcome::Exhausted,
            turn: None,
            arc: None,
        }
    } else {
        LayerStep {
            dt: to_exit,
            offset: state.offset + horizontal * to_exit,
            depth: target,
            outcome: StepOutcome::Exited(boundary),
            turn: None,
            arc: None,
        }
    }
}

/// Steep ray through a gradient layer.
///
/// With `p v` negligible the ray cannot turn and `dz/dt` is effectively `v`,
/// so depth is exponential in time. Exit time and horizontal drift use the
/// arc relations written without cancellation:
/// `dt = ln((v1 / v0) (1 + c0) / (1 + c1)) / g` and
/// `dx = p (v1^2 - v0^2) / ((c0 + c1) g)` with `c = sqrt(1 - (p v)^2)`.
fn trace_vertical(layer: &Layer, state: &RayState) -> LayerStep {
    let slowness = state.slowness;
    let cosine = |velocity: f64| (1.0 - (slowness * velocity).powi(2)).sqrt();
    let drift = |from: f64, to: f64| {
        (slowness * (to * to - from * from) / ((cosine(from) + cosine(to)) * layer.gradient)).abs()
    };

    let heading = state.heading();
    let boundary = heading.boundary_ahead();
    let start_velocity = layer.velocity_at(state.depth);
    let exit_velocity = layer.boundary_velocity(boundary);
    let ratio = (exit_velocity * (1.0 + cosine(start_velocity)))
        / (start_velocity * (1.0 + cosine(exit_velocity)));
    let to_exit = ratio.ln().abs() / layer.gradient.abs();

    if to_exit >= state.remaining {
        let growth = (layer.gradient * state.remaining).exp();
        let velocity = match heading {
            Heading::Down => start_velocity * growth,
            Heading::Up => start_velocity / growth,
        };
        LayerStep {
            dt: state.remaining,
            offset: state.offset + drift(start_velocity, velocity),
            depth: layer.depth_at_velocity(velocity),
            outcome: StepOutcome::Exhausted,
            turn: None,
            arc: None,
        }
    } else {
        LayerStep {
            dt: to_exit,
            offset: state.offset + drift(start_velocity, exit_velocity),
            depth: layer.boundary_depth(boundary),
            outcome: StepOutcome::Exited(boundary),
            turn: None,
            arc: None,
        }
    }
}
