/// Numerical constants used by the raytracing engine

/// Layers whose velocity gradient magnitude is at or below this value (1/s)
/// are treated as homogeneous and traced along straight lines.
pub const GRADIENT_TOLERANCE: f64 = 0.00001;

/// Allowed excess of the Snell product `p * v` above unity
///
/// A ray whose sine of incidence `p * v` lands in `(1, 1 + GRAZING_TOLERANCE]`
/// is considered exactly grazing: the product only differs from one by
/// floating-point rounding accumulated across layer boundaries. Anything
/// larger means the ray cannot enter the layer at its current depth and
/// turns back through the face it came from.
pub const GRAZING_TOLERANCE: f64 = 1e-9;

/// Sines of the launch angle smaller than this are snapped to zero
///
/// `sin(PI)` evaluates to ~1.2e-16 rather than zero. Left alone, that would
/// send a straight-up ray into a circular arc with a radius of ~1e19 m and
/// lose all precision in the arc centre.
pub const VERTICAL_RAY_THRESHOLD: f64 = 1e-15;

/// Gradient-layer rays whose sine of incidence stays below this value are
/// traced as steep rays instead of circular arcs
///
/// Such arcs have radii beyond ~1e8 m, and their horizontal offsets would be
/// differences of nearly equal half chords.
pub const NEAR_VERTICAL_SINE: f64 = 1e-5;

/// Consecutive zero-time layer steps allowed per model layer before a trace
/// is abandoned
pub const MAX_STALLED_STEPS_PER_LAYER: usize = 4;

/// Number of interpolated points recorded along each circular arc
pub const ARC_PLOT_SEGMENTS: usize = 5;

/// Default capacity used by the command line front end for recorded paths
pub const DEFAULT_PATH_CAPACITY: usize = 256;
