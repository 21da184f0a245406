//! Central body definitions.
//!
//! A `CentralBody` is passed explicitly to everything that needs μ or a
//! reference radius, so several bodies (or several runs with different
//! constants) can coexist in one process.

use serde::Serialize;
use crate::constants::*;

/// Gravitating body at the origin of the inertial frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CentralBody {
    /// Display name.
    pub name: &'static str,
    /// Gravitational parameter μ (km³/s²)
    pub mu: f64,
    /// Mean (reference) radius (km)
    pub radius: f64,
}

/// Earth with WGS84 constants.
pub const EARTH: CentralBody = CentralBody {
    name: "Earth",
    mu: MU_EARTH,
    radius: R_EARTH,
};

impl CentralBody {
    /// Circular orbital speed at radius `r` (km/s).
    pub fn circular_speed(&self, r: f64) -> f64 {
        (self.mu / r).sqrt()
    }

    /// Altitude above the reference radius for a geocentric distance `r` (km).
    pub fn altitude(&self, r: f64) -> f64 {
        r - self.radius
    }
}

impl Default for CentralBody {
    fn default() -> Self {
        EARTH
    }
}
