//! Closed-form time/velocity relations along circular ray arcs.
//!
//! In a layer where velocity is linear in depth, `v = g (z - zc)`, a ray with
//! parameter `p` satisfies `sin(theta) = p v`. Writing
//! `f(v) = acosh(1 / (p v))`, the travel time between two velocities on the
//! same side of the turning point is `|f(v1) - f(v2)| / |g|`, and `f` vanishes
//! at the turning point where `p v = 1`. Both the arc integrator and the
//! time-exhaustion depth solver are built on this single function.

use crate::velocity_model::Layer;

/// Arc parameter `acosh(1 / (p v))`, written out as a logarithm.
///
/// Grazing rays (`p v` at or rounding just above 1) map to zero.
pub fn arc_parameter(slowness: f64, velocity: f64) -> f64 {
    let q = 1.0 / (slowness * velocity);
    (q + (q * q - 1.0).max(0.0).sqrt()).ln().max(0.0)
}

/// Position of the ray relative to the turning point of its arc
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcPhase {
    /// Moving towards a turning point it has not reached yet
    Approaching,
    /// Moving away from the turning point without having passed it
    Receding,
    /// Has passed the turning point during this step
    PastTurn,
}

impl ArcPhase {
    /// (time sign, arc parameter sign) of the exponent in the depth solver
    fn signs(self) -> (f64, f64) {
        match self {
            ArcPhase::Approaching => (-1.0, 1.0),
            ArcPhase::Receding => (1.0, 1.0),
            ArcPhase::PastTurn => (1.0, -1.0),
        }
    }
}

/// Depth reached after `time` seconds along an arc that started with arc
/// parameter `beta`.
///
/// The arc parameter after the step is `dir * |g| t + turn * beta`; mapping it
/// through `alpha = p e^f` gives the velocity `2 alpha / (alpha^2 + p^2)`,
/// which is `1 / (p cosh f)`, and the layer's linear law turns that velocity
/// back into depth.
pub fn exhaustion_depth(
    layer: &Layer,
    slowness: f64,
    beta: f64,
    time: f64,
    phase: ArcPhase,
) -> f64 {
    let (dir_sign, turn_sign) = phase.signs();
    let alpha = slowness * (dir_sign * time * layer.gradient.abs() + turn_sign * beta).exp();
    let velocity = 2.0 * alpha / (alpha * alpha + slowness * slowness);
    layer.depth_at_velocity(velocity)
}
