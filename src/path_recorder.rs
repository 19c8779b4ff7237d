//! Optional recording of the ray path during a trace.

use serde::{Deserialize, Serialize};

use crate::constants::ARC_PLOT_SEGMENTS;
use crate::layer_integrator::LayerStep;
use crate::ray_state::RayState;

/// Single path point, offset signed by the launch direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub offset: f64,
    pub depth: f64,
    /// Travel time from the source (s)
    pub time: f64,
}

/// Point density of a recorded path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// Layer crossings plus intermediate samples along every arc
    #[default]
    Full,
    /// Only the source and the end of each layer step
    Table,
}

/// Receiver of path points during a trace
pub trait PathSink {
    fn mode(&self) -> RecordMode;
    fn append(&mut self, point: PathPoint);
}

/// Bounded in-memory path buffer.
///
/// Points past the capacity are dropped without error; a trace never fails
/// because its path did not fit.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRecorder {
    mode: RecordMode,
    capacity: usize,
    points: Vec<PathPoint>,
}

impl PathRecorder {
    pub fn new(capacity: usize, mode: RecordMode) -> Self {
        Self {
            mode,
            capacity,
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<PathPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl PathSink for PathRecorder {
    fn mode(&self) -> RecordMode {
        self.mode
    }

    fn append(&mut self, point: PathPoint) {
        if !self.is_full() {
            self.points.push(point);
        }
    }
}

/// Record the points of one layer step taken from `before`.
///
/// The last point of a step always carries the step's end time exactly, so a
/// recorded path ends at the trace's elapsed time.
pub(crate) fn record_step(sink: &mut dyn PathSink, before: &RayState, step: &LayerStep) {
    let direction = before.direction;
    let end_time = before.elapsed + step.dt;
    match (sink.mode(), step.arc) {
        (RecordMode::Full, Some(arc)) => {
            let samples = arc.sample(
                (before.offset, before.depth),
                (step.offset, step.depth),
                ARC_PLOT_SEGMENTS,
            );
            let last = samples.len().saturating_sub(1);
            for (i, sample) in samples.into_iter().enumerate() {
                let time = if i == last {
                    end_time
                } else {
                    (before.elapsed + sample.time).min(end_time)
                };
                sink.append(PathPoint {
                    offset: direction * sample.offset,
                    depth: sample.depth,
                    time,
                });
            }
        }
        _ => sink.append(PathPoint {
            offset: direction * step.offset,
            depth: step.depth,
            time: end_time,
        }),
    }
}
