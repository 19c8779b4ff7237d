//! Parallel tracing of many rays through one shared model.

use rayon::prelude::*;

use crate::error::{RaytraceError, RaytraceResult};
use crate::path_recorder::{PathPoint, PathRecorder, RecordMode};
use crate::raytrace::{trace, RayRequest, TraceResult};
use crate::velocity_model::VelocityModel;

/// Configure the global rayon pool used by the batch functions.
///
/// The global pool can only be built once per process; later attempts are
/// logged and the existing pool is kept.
pub fn configure_thread_pool(num_threads: Option<usize>) -> RaytraceResult<()> {
    if let Some(n) = num_threads {
        if n == 0 {
            return Err(RaytraceError::invalid_request(
                "thread count must be greater than 0",
            ));
        }
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            tracing::warn!(threads = n, error = %e, "using existing thread pool");
        }
    }
    Ok(())
}

/// Trace every request in parallel. Results keep the order of `requests` and
/// failures are reported per ray.
pub fn trace_many(
    model: &VelocityModel,
    requests: &[RayRequest],
) -> Vec<RaytraceResult<TraceResult>> {
    tracing::debug!(rays = requests.len(), "tracing batch");
    requests
        .par_iter()
        .map(|request| model.trace(request))
        .collect()
}

/// Like [`trace_many`], also recording each ray's path
pub fn trace_many_recorded(
    model: &VelocityModel,
    requests: &[RayRequest],
    capacity: usize,
    mode: RecordMode,
) -> Vec<RaytraceResult<(TraceResult, Vec<PathPoint>)>> {
    requests
        .par_iter()
        .map(|request| -> RaytraceResult<(TraceResult, Vec<PathPoint>)> {
            let mut recorder = PathRecorder::new(capacity, mode);
            let result = trace(model, request, Some(&mut recorder))?;
            Ok((result, recorder.into_points()))
        })
        .collect()
}

/// Requests for a symmetric swath of `beams` launch angles spread evenly
/// from `-max_angle_deg` to `max_angle_deg`. All other fields come from
/// `template`; a single beam points straight down.
pub fn fan_requests(
    template: &RayRequest,
    max_angle_deg: f64,
    beams: usize,
) -> RaytraceResult<Vec<RayRequest>> {
    if beams == 0 {
        return Err(RaytraceError::invalid_request("a fan needs at least one beam"));
    }
    if !(max_angle_deg.is_finite() && (0.0..=180.0).contains(&max_angle_deg)) {
        return Err(RaytraceError::invalid_request(format!(
            "fan half-width {max_angle_deg} deg is outside [0, 180]"
        )));
    }

    let spacing = if beams > 1 {
        2.0 * max_angle_deg / (beams - 1) as f64
    } else {
        0.0
    };
    let first = if beams > 1 { -max_angle_deg } else { 0.0 };
    Ok((0..beams)
        .map(|i| RayRequest {
            launch_angle_deg: first + i as f64 * spacing,
            ..template.clone()
        })
        .collect())
}
