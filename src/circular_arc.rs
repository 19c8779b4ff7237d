//! Ray paths through gradient layers.
//!
//! With a non-zero ray parameter `p` the ray follows a circle of radius
//! `1 / (p |g|)` centred on the layer's zero-velocity depth. The four cases
//! (descending or ascending, velocity increasing or decreasing with depth)
//! only differ in which side of the circle the ray starts on and whether the
//! turning point lies ahead of it, so one integrator covers all of them.

use std::f64::consts::PI;

use crate::layer_integrator::{LayerStep, StepOutcome};
use crate::ray_state::{Heading, RayState};
use crate::turning_depth::{arc_parameter, exhaustion_depth, ArcPhase};
use crate::velocity_model::{Boundary, Layer};

/// Heading and gradient sign of a ray inside a gradient layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcQuadrant {
    /// Descending into faster water; may turn upward inside the layer
    DescendingIncreasing,
    /// Ascending into slower water
    AscendingIncreasing,
    /// Descending into slower water
    DescendingDecreasing,
    /// Ascending into faster water; may turn downward inside the layer
    AscendingDecreasing,
}

impl ArcQuadrant {
    pub fn classify(heading: Heading, gradient: f64) -> Self {
        match (heading, gradient > 0.0) {
            (Heading::Down, true) => ArcQuadrant::DescendingIncreasing,
            (Heading::Up, true) => ArcQuadrant::AscendingIncreasing,
            (Heading::Down, false) => ArcQuadrant::DescendingDecreasing,
            (Heading::Up, false) => ArcQuadrant::AscendingDecreasing,
        }
    }

    pub fn heading(self) -> Heading {
        match self {
            ArcQuadrant::DescendingIncreasing | ArcQuadrant::DescendingDecreasing => Heading::Down,
            ArcQuadrant::AscendingIncreasing | ArcQuadrant::AscendingDecreasing => Heading::Up,
        }
    }

    /// True when velocity increases along the path, i.e. the turning point is ahead
    pub fn approaches_turn(self) -> bool {
        matches!(
            self,
            ArcQuadrant::DescendingIncreasing | ArcQuadrant::AscendingDecreasing
        )
    }
}

/// Which half of the circle a point lies on, relative to the turning point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcSide {
    /// Before the turning point (offset below the centre offset)
    Near,
    /// Past the turning point (offset above the centre offset)
    Far,
}

/// Circle followed by the ray inside one gradient layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcGeometry {
    pub center_offset: f64,
    pub center_depth: f64,
    pub radius: f64,
    /// Velocity gradient of the layer the circle belongs to
    pub gradient: f64,
}

/// Point along an arc with the travel time from the start of the arc
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSample {
    pub offset: f64,
    pub depth: f64,
    pub time: f64,
}

impl ArcGeometry {
    /// Circle through (offset, depth) for the given ray parameter
    pub fn through(layer: &Layer, slowness: f64, offset: f64, depth: f64, side: ArcSide) -> Self {
        let radius = (1.0 / (slowness * layer.gradient)).abs();
        let mut arc = Self {
            center_offset: 0.0,
            center_depth: layer.depth_center,
            radius,
            gradient: layer.gradient,
        };
        let half_chord = arc.half_chord(depth);
        arc.center_offset = match side {
            ArcSide::Near => offset + half_chord,
            ArcSide::Far => offset - half_chord,
        };
        arc
    }

    /// Horizontal distance from the centre to the circle at a depth
    fn half_chord(&self, depth: f64) -> f64 {
        let dz = depth - self.center_depth;
        (self.radius * self.radius - dz * dz).max(0.0).sqrt()
    }

    pub fn offset_at(&self, depth: f64, side: ArcSide) -> f64 {
        match side {
            ArcSide::Near => self.center_offset - self.half_chord(depth),
            ArcSide::Far => self.center_offset + self.half_chord(depth),
        }
    }

    /// Depth where the ray runs horizontal
    pub fn turning_depth(&self, gradient: f64) -> f64 {
        if gradient > 0.0 {
            self.center_depth + self.radius
        } else {
            self.center_depth - self.radius
        }
    }

    /// Strictly inside the layer; a turning point on the boundary belongs to the next layer
    pub fn turns_within(&self, layer: &Layer) -> bool {
        if layer.gradient > 0.0 {
            self.turning_depth(layer.gradient) < layer.depth_bottom
        } else {
            self.turning_depth(layer.gradient) > layer.depth_top
        }
    }

    /// Evenly spaced points along the arc from `start` to `end`, excluding
    /// `start`. Start and end are (offset, depth) pairs.
    ///
    /// At polar angle `phi` from the downward vertical through the centre the
    /// velocity is `|g| R |cos phi|`, so the time from `phi0` is
    /// `|atanh(sin phi) - atanh(sin phi0)| / |g|`.
    pub fn sample(&self, start: (f64, f64), end: (f64, f64), segments: usize) -> Vec<ArcSample> {
        let angle_start = (start.0 - self.center_offset).atan2(start.1 - self.center_depth);
        let angle_end = (end.0 - self.center_offset).atan2(end.1 - self.center_depth);
        let mut sweep = angle_end - angle_start;
        if sweep > PI {
            sweep -= 2.0 * PI;
        } else if sweep <= -PI {
            sweep += 2.0 * PI;
        }
        let step = sweep / segments as f64;
        let arc_start = angle_start.sin().atanh();
        let abs_gradient = self.gradient.abs();

        (1..=segments)
            .map(|i| {
                let angle = angle_start + i as f64 * step;
                ArcSample {
                    offset: self.center_offset + self.radius * angle.sin(),
                    depth: self.center_depth + self.radius * angle.cos(),
                    time: (angle.sin().atanh() - arc_start).abs() / abs_gradient,
                }
            })
            .collect()
    }
}

/// Advance a ray with `p > 0` through a gradient layer.
///
/// Decision order: can the ray turn in this layer; if so, does the budget run
/// out before the turn, after the turn but inside the layer, or only after it
/// has left through the face it came from. Rays that cannot turn leave through
/// the face ahead of them unless the budget runs out first.
pub fn trace_arc(layer: &Layer, state: &RayState, quadrant: ArcQuadrant) -> LayerStep {
    let slowness = state.slowness;
    let abs_gradient = layer.gradient.abs();
    let approaching = quadrant.approaches_turn();
    let start_side = if approaching { ArcSide::Near } else { ArcSide::Far };
    let arc = ArcGeometry::through(layer, slowness, state.offset, state.depth, start_side);
    let beta = arc_parameter(slowness, layer.velocity_at(state.depth));
    let ahead = quadrant.heading().boundary_ahead();
    let budget = state.remaining;

    if approaching && arc.turns_within(layer) {
        let to_turn = beta / abs_gradient;
        if to_turn >= budget {
            return exhausted(
                layer,
                &arc,
                slowness,
                beta,
                budget,
                ArcPhase::Approaching,
                ArcSide::Near,
                None,
            );
        }

        let behind = ahead.opposite();
        let to_exit =
            (arc_parameter(slowness, layer.boundary_velocity(behind)) + beta) / abs_gradient;
        let turn = Some(quadrant.heading().reversed());
        if to_exit <= budget {
            exited(layer, &arc, behind, to_exit, ArcSide::Far, turn)
        } else {
            exhausted(
                layer,
                &arc,
                slowness,
                beta,
                budget,
                ArcPhase::PastTurn,
                ArcSide::Far,
                turn,
            )
        }
    } else {
        let to_exit = (arc_parameter(slowness, layer.boundary_velocity(ahead)) - beta).abs()
            / abs_gradient;
        if to_exit <= budget {
            exited(layer, &arc, ahead, to_exit, start_side, None)
        } else {
            let phase = if approaching {
                ArcPhase::Approaching
            } else {
                ArcPhase::Receding
            };
            exhausted(layer, &arc, slowness, beta, budget, phase, start_side, None)
        }
    }
}

fn exited(
    layer: &Layer,
    arc: &ArcGeometry,
    boundary: Boundary,
    dt: f64,
    side: ArcSide,
    turn: Option<Heading>,
) -> LayerStep {
    let depth = layer.boundary_depth(boundary);
    LayerStep {
        dt,
        offset: arc.offset_at(depth, side),
        depth,
        outcome: StepOutcome::Exited(boundary),
        turn,
        arc: Some(*arc),
    }
}

#[allow(clippy::too_many_arguments)]
fn exhausted(
    layer: &Layer,
    arc: &ArcGeometry,
    slowness: f64,
    beta: f64,
    budget: f64,
    phase: ArcPhase,
    side: ArcSide,
    turn: Option<Heading>,
) -> LayerStep {
    let depth = exhaustion_depth(layer, slowness, beta, budget, phase);
    LayerStep {
        dt: budget,
        offset: arc.offset_at(depth, side),
        depth,
        outcome: StepOutcome::Exhausted,
        turn,
        arc: Some(*arc),
    }
}
