//! Per-trace ray state and its initialization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{GRAZING_TOLERANCE, VERTICAL_RAY_THRESHOLD};
use crate::error::{RaytraceError, RaytraceResult};
use crate::layer_integrator::{LayerStep, StepOutcome};
use crate::path_recorder::PathPoint;
use crate::raytrace::RayRequest;
use crate::velocity_model::{Boundary, Layer, VelocityModel};

/// Classification of a ray at the end of a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RayStatus {
    /// Descending, never turned
    Down,
    /// Launched upward, never turned
    Up,
    /// Turned from ascending to descending
    DownTurn,
    /// Turned from descending to ascending
    UpTurn,
    /// Left the model through its top
    OutTop,
    /// Left the model through its bottom
    OutBottom,
}

impl RayStatus {
    /// Numeric status code used by older processing chains
    pub fn code(self) -> u8 {
        match self {
            RayStatus::Down => 1,
            RayStatus::Up => 2,
            RayStatus::DownTurn => 3,
            RayStatus::UpTurn => 4,
            RayStatus::OutBottom => 5,
            RayStatus::OutTop => 6,
        }
    }

    pub fn is_out_of_bounds(self) -> bool {
        matches!(self, RayStatus::OutTop | RayStatus::OutBottom)
    }
}

impl fmt::Display for RayStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RayStatus::Down => "down",
            RayStatus::Up => "up",
            RayStatus::DownTurn => "down_turn",
            RayStatus::UpTurn => "up_turn",
            RayStatus::OutTop => "out_top",
            RayStatus::OutBottom => "out_bottom",
        };
        write!(f, "{name}")
    }
}

/// How the launch angle is reconciled with the surface sound velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SsvMode {
    /// Use the launch angle as given
    #[default]
    Ignore,
    /// The angle was measured with a correct surface velocity: carry it to the
    /// model velocity at the source with flat-layer Snell's law
    AssumeCorrect,
    /// The angle was steered with a wrong surface velocity: apply Snell's law
    /// in the receiver frame rotated by the null angle
    AssumeIncorrect,
}

/// Vertical heading of the ray
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Down,
    Up,
}

impl Heading {
    pub fn reversed(self) -> Self {
        match self {
            Heading::Down => Heading::Up,
            Heading::Up => Heading::Down,
        }
    }

    /// Layer face the ray is moving towards
    pub fn boundary_ahead(self) -> Boundary {
        match self {
            Heading::Down => Boundary::Bottom,
            Heading::Up => Boundary::Top,
        }
    }
}

/// Mutable state of one ray while it is traced
///
/// `offset` is measured along the launch direction and is always
/// non-negative; `direction` carries the sign applied when the state is
/// reported.
#[derive(Debug, Clone, PartialEq)]
pub struct RayState {
    pub offset: f64,
    pub depth: f64,
    pub elapsed: f64,
    pub remaining: f64,
    pub layer: usize,
    pub turned: bool,
    pub direction: f64,
    pub slowness: f64,
    pub status: RayStatus,
    pub finished: bool,
}

impl RayState {
    /// Locate the source, apply the surface velocity correction and set the
    /// ray parameter.
    pub fn launch(model: &VelocityModel, request: &RayRequest) -> RaytraceResult<Self> {
        let layer = model
            .layer_index_containing(request.source_depth)
            .ok_or_else(|| {
                let (top, bottom) = model.depth_range();
                RaytraceError::SourceDepthOutOfRange {
                    depth: request.source_depth,
                    top,
                    bottom,
                }
            })?;
        let source_velocity = model.layers()[layer].ray_velocity(request.source_depth);

        let angle = corrected_launch_angle(request, source_velocity);
        let direction = if angle > 0.0 { 1.0 } else { -1.0 };
        let angle = angle.abs();

        let mut sine = angle.to_radians().sin();
        if sine.abs() < VERTICAL_RAY_THRESHOLD {
            sine = 0.0;
        }
        let (turned, status) = if angle < 90.0 {
            (false, RayStatus::Down)
        } else {
            (true, RayStatus::Up)
        };

        Ok(Self {
            offset: 0.0,
            depth: request.source_depth,
            elapsed: 0.0,
            remaining: request.max_time,
            layer,
            turned,
            direction,
            slowness: sine / source_velocity,
            status,
            finished: false,
        })
    }

    pub fn heading(&self) -> Heading {
        if self.turned {
            Heading::Up
        } else {
            Heading::Down
        }
    }

    /// Current position with the launch direction applied
    pub fn point(&self) -> PathPoint {
        PathPoint {
            offset: self.direction * self.offset,
            depth: self.depth,
            time: self.elapsed,
        }
    }

    /// True when the ray parameter exceeds the slowness the ray is traced
    /// with at its current depth, i.e. the ray cannot enter `layer` here.
    pub fn is_blocked(&self, layer: &Layer) -> bool {
        self.slowness * layer.ray_velocity(self.depth) > 1.0 + GRAZING_TOLERANCE
    }

    /// Refuse to trace a ray whose parameter cannot exist at its source.
    pub fn ensure_propagating(&self, layer: &Layer) -> RaytraceResult<()> {
        if !self.is_blocked(layer) {
            return Ok(());
        }
        let velocity = layer.ray_velocity(self.depth);
        tracing::warn!(
            layer = self.layer,
            slowness = self.slowness,
            velocity,
            "ray parameter exceeds local slowness"
        );
        Err(RaytraceError::NonPropagatingRay {
            layer: self.layer,
            slowness: self.slowness,
            velocity,
        })
    }

    /// Fold one layer step into the state.
    pub fn advance(&mut self, step: &LayerStep, layer_count: usize) {
        self.offset = step.offset;
        self.depth = step.depth;
        self.elapsed += step.dt;

        if let Some(heading) = step.turn {
            self.turned = heading == Heading::Up;
            self.status = match heading {
                Heading::Up => RayStatus::UpTurn,
                Heading::Down => RayStatus::DownTurn,
            };
        }

        match step.outcome {
            StepOutcome::Exhausted => {
                self.remaining = 0.0;
            }
            StepOutcome::Exited(Boundary::Top) => {
                self.remaining -= step.dt;
                if self.layer == 0 {
                    self.status = RayStatus::OutTop;
                    self.finished = true;
                } else {
                    self.layer -= 1;
                }
            }
            StepOutcome::Exited(Boundary::Bottom) => {
                self.remaining -= step.dt;
                if self.layer + 1 >= layer_count {
                    self.status = RayStatus::OutBottom;
                    self.finished = true;
                } else {
                    self.layer += 1;
                }
            }
        }

        if self.remaining <= 0.0 {
            self.finished = true;
        }
    }
}

/// Launch angle (degrees) after the requested surface velocity correction
pub fn corrected_launch_angle(request: &RayRequest, source_velocity: f64) -> f64 {
    if request.surface_velocity <= 0.0 {
        return request.launch_angle_deg;
    }
    match request.ssv_mode {
        SsvMode::Ignore => request.launch_angle_deg,
        SsvMode::AssumeCorrect => snell_reproject(
            request.launch_angle_deg,
            request.surface_velocity,
            source_velocity,
        ),
        SsvMode::AssumeIncorrect => {
            request.null_angle_deg
                + snell_reproject(
                    request.launch_angle_deg - request.null_angle_deg,
                    request.surface_velocity,
                    source_velocity,
                )
        }
    }
}

/// Carry an angle from one velocity to another across flat layers
fn snell_reproject(angle_deg: f64, from_velocity: f64, to_velocity: f64) -> f64 {
    let slowness = angle_deg.to_radians().sin() / from_velocity;
    (slowness * to_velocity).clamp(-1.0, 1.0).asin().to_degrees()
}
