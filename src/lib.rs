//! # SVP Raytrace
//!
//! Acoustic raytracing through a piecewise-linear sound-velocity profile.
//!
//! Rays are traced with closed-form expressions: straight lines in homogeneous
//! layers and circular arcs in constant-gradient layers, so the result for a
//! given travel time is exact up to floating-point rounding.
//!
//! ```
//! use svp_raytrace::{build_model, RayRequest, RayStatus};
//!
//! let model = build_model(&[(0.0, 1500.0), (100.0, 1520.0), (500.0, 1480.0)])?;
//! let result = model.trace(&RayRequest {
//!     source_depth: 5.0,
//!     launch_angle_deg: 30.0,
//!     max_time: 0.1,
//!     ..Default::default()
//! })?;
//! assert_eq!(result.status, RayStatus::Down);
//! # Ok::<(), svp_raytrace::RaytraceError>(())
//! ```

// Re-export the main types and functions
pub use batch::{configure_thread_pool, fan_requests, trace_many, trace_many_recorded};
pub use error::{RaytraceError, RaytraceResult};
pub use path_recorder::{PathPoint, PathRecorder, PathSink, RecordMode};
pub use ray_state::{corrected_launch_angle, RayStatus, SsvMode};
pub use raytrace::{trace, RayRequest, TraceResult};
pub use velocity_model::{build_model, Layer, LayerMode, VelocityModel, VelocityNode};

// Module declarations
pub mod batch;
pub mod constants;
mod error;
pub mod path_recorder;
pub mod ray_state;
pub mod raytrace;
pub mod velocity_model;

mod circular_arc;
mod layer_integrator;
mod turning_depth;
