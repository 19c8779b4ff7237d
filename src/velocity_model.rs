//! Layered sound-velocity model.
//!
//! A sound-velocity profile is a list of (depth, velocity) nodes. Between two
//! consecutive nodes the velocity varies linearly with depth, so every layer is
//! either homogeneous (constant velocity, straight ray paths) or has a constant
//! gradient, in which case rays with a non-zero ray parameter follow circular
//! arcs centred on the depth where the layer's velocity line extrapolates to
//! zero.

use serde::Serialize;

use crate::constants::GRADIENT_TOLERANCE;
use crate::error::{RaytraceError, RaytraceResult};

/// One depth/velocity sample of the profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VelocityNode {
    pub depth_m: f64,
    pub velocity_mps: f64,
}

/// How rays are traced through a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerMode {
    Homogeneous,
    Gradient,
}

/// Derived, immutable description of the interval between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Layer {
    pub depth_top: f64,
    pub depth_bottom: f64,
    pub velocity_top: f64,
    pub velocity_bottom: f64,
    pub gradient: f64,
    pub mode: LayerMode,
    /// Depth where the velocity line reaches zero; 0.0 for homogeneous layers
    pub depth_center: f64,
}

impl Layer {
    fn between(top: VelocityNode, bottom: VelocityNode) -> Self {
        let gradient =
            (bottom.velocity_mps - top.velocity_mps) / (bottom.depth_m - top.depth_m);
        let (mode, depth_center) = if gradient.abs() > GRADIENT_TOLERANCE {
            (
                LayerMode::Gradient,
                top.depth_m - top.velocity_mps / gradient,
            )
        } else {
            (LayerMode::Homogeneous, 0.0)
        };

        Self {
            depth_top: top.depth_m,
            depth_bottom: bottom.depth_m,
            velocity_top: top.velocity_mps,
            velocity_bottom: bottom.velocity_mps,
            gradient,
            mode,
            depth_center,
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, depth_m: f64) -> bool {
        depth_m >= self.depth_top && depth_m <= self.depth_bottom
    }

    /// Linear velocity at a depth (extrapolates outside the layer)
    pub fn velocity_at(&self, depth_m: f64) -> f64 {
        self.velocity_top + self.gradient * (depth_m - self.depth_top)
    }

    /// Inverse of [`Layer::velocity_at`]; only meaningful for gradient layers
    pub fn depth_at_velocity(&self, velocity_mps: f64) -> f64 {
        self.depth_top + (velocity_mps - self.velocity_top) / self.gradient
    }

    /// Velocity a ray is traced with at `depth_m`: homogeneous layers use
    /// their top velocity throughout
    pub fn ray_velocity(&self, depth_m: f64) -> f64 {
        match self.mode {
            LayerMode::Homogeneous => self.velocity_top,
            LayerMode::Gradient => self.velocity_at(depth_m),
        }
    }

    /// Fastest velocity anywhere in the layer
    pub fn max_velocity(&self) -> f64 {
        self.velocity_top.max(self.velocity_bottom)
    }

    pub fn boundary_depth(&self, boundary: Boundary) -> f64 {
        match boundary {
            Boundary::Top => self.depth_top,
            Boundary::Bottom => self.depth_bottom,
        }
    }

    pub fn boundary_velocity(&self, boundary: Boundary) -> f64 {
        match boundary {
            Boundary::Top => self.velocity_top,
            Boundary::Bottom => self.velocity_bottom,
        }
    }
}

/// Upper or lower face of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Top,
    Bottom,
}

impl Boundary {
    pub fn opposite(self) -> Self {
        match self {
            Boundary::Top => Boundary::Bottom,
            Boundary::Bottom => Boundary::Top,
        }
    }
}

/// Immutable layered velocity model shared by any number of traces
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityModel {
    nodes: Vec<VelocityNode>,
    layers: Vec<Layer>,
}

impl VelocityModel {
    /// Build a model from (depth, velocity) pairs ordered by depth.
    ///
    /// Depths must be strictly increasing and velocities strictly positive;
    /// at least two nodes are required.
    pub fn new(profile: &[(f64, f64)]) -> RaytraceResult<Self> {
        if profile.len() < 2 {
            return Err(RaytraceError::invalid_profile(format!(
                "at least 2 nodes are required, got {}",
                profile.len()
            )));
        }

        let mut nodes = Vec::with_capacity(profile.len());
        for (i, &(depth_m, velocity_mps)) in profile.iter().enumerate() {
            if !depth_m.is_finite() || !velocity_mps.is_finite() {
                return Err(RaytraceError::invalid_profile(format!(
                    "node {i} is not finite: depth {depth_m}, velocity {velocity_mps}"
                )));
            }
            if velocity_mps <= 0.0 {
                return Err(RaytraceError::invalid_profile(format!(
                    "node {i} has non-positive velocity {velocity_mps} m/s"
                )));
            }
            if let Some(prev) = nodes.last().map(|n: &VelocityNode| n.depth_m) {
                if depth_m <= prev {
                    return Err(RaytraceError::invalid_profile(format!(
                        "depth must increase strictly: node {i} at {depth_m} m follows {prev} m"
                    )));
                }
            }
            nodes.push(VelocityNode {
                depth_m,
                velocity_mps,
            });
        }

        let layers: Vec<Layer> = nodes
            .windows(2)
            .map(|pair| Layer::between(pair[0], pair[1]))
            .collect();

        tracing::debug!(
            nodes = nodes.len(),
            layers = layers.len(),
            gradient_layers = layers
                .iter()
                .filter(|l| l.mode == LayerMode::Gradient)
                .count(),
            "built velocity model"
        );

        Ok(Self { nodes, layers })
    }

    pub fn nodes(&self) -> &[VelocityNode] {
        &self.nodes
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Shallowest and deepest node depths
    pub fn depth_range(&self) -> (f64, f64) {
        (self.layers[0].depth_top, self.layers[self.layers.len() - 1].depth_bottom)
    }

    pub fn max_velocity(&self) -> f64 {
        self.nodes
            .iter()
            .map(|n| n.velocity_mps)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Index of the layer holding `depth_m`.
    ///
    /// Boundaries are inclusive on both sides and the deepest matching layer
    /// wins, so a depth sitting exactly on an internal node belongs to the
    /// layer below it.
    pub fn layer_index_containing(&self, depth_m: f64) -> Option<usize> {
        self.layers.iter().rposition(|layer| layer.contains(depth_m))
    }

    /// Interpolated velocity at a depth inside the model
    pub fn velocity_at(&self, depth_m: f64) -> Option<f64> {
        self.layer_index_containing(depth_m)
            .map(|i| self.layers[i].velocity_at(depth_m))
    }
}

/// Build a velocity model from (depth, velocity) pairs
pub fn build_model(profile: &[(f64, f64)]) -> RaytraceResult<VelocityModel> {
    VelocityModel::new(profile)
}
