//! Physical and astrodynamic constants.

/// Earth gravitational parameter (km³/s²) — WGS84
pub const MU_EARTH: f64 = 398600.4418;

/// Earth equatorial radius (km) — WGS84
pub const R_EARTH: f64 = 6378.137;

/// Seconds per solar day
pub const SOLAR_DAY: f64 = 86400.0;

/// Seconds per minute
pub const MINUTE: f64 = 60.0;

/// Two pi
pub const TAU: f64 = std::f64::consts::TAU;

/// Degrees to radians
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

/// Largest accepted |e_recovered - e| before a sample is flagged as inconsistent.
///
/// Two-body motion conserves eccentricity exactly, so anything above this
/// is round-off amplification or a reconstruction bug.
pub const ECCENTRICITY_CHECK_TOLERANCE: f64 = 1e-8;
