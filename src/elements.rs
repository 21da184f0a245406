//! Classical orbital elements and their validation.
//!
//! Elements are validated once against a [`CentralBody`] and are immutable
//! afterwards. Angles are stored in radians; Ω, ω and M₀ are normalised
//! into [0, 2π) at construction.

use serde::Serialize;
use crate::body::CentralBody;
use crate::constants::*;
use crate::error::PropagationError;

/// Classical (osculating) Keplerian orbital elements of a bound orbit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitalElements {
    /// Semi-major axis (km)
    a: f64,
    /// Eccentricity (dimensionless)
    e: f64,
    /// Inclination (rad)
    i: f64,
    /// Right ascension of ascending node (rad)
    raan: f64,
    /// Argument of periapsis (rad)
    aop: f64,
    /// Mean anomaly at epoch (rad)
    ma: f64,
}

impl OrbitalElements {
    /// Validate and build an element set (angles in radians).
    ///
    /// Rejects non-finite values, `e ∉ [0, 1)`, `i ∉ [0, π]` and orbits whose
    /// periapsis radius `a(1-e)` does not clear the body radius.
    pub fn new(
        a: f64,
        e: f64,
        i: f64,
        raan: f64,
        aop: f64,
        ma: f64,
        body: &CentralBody,
    ) -> Result<Self, PropagationError> {
        let fields = [("a", a), ("e", e), ("i", i), ("raan", raan), ("aop", aop), ("ma", ma)];
        if let Some(&(field, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PropagationError::elements(field, value, "must be finite"));
        }
        if a <= 0.0 {
            return Err(PropagationError::elements("a", a, "semi-major axis must be positive"));
        }
        if !(0.0..1.0).contains(&e) {
            return Err(PropagationError::elements("e", e, "bound orbits need 0 <= e < 1"));
        }
        if !(0.0..=std::f64::consts::PI).contains(&i) {
            return Err(PropagationError::elements("i", i, "inclination must lie in [0, pi]"));
        }
        if a * (1.0 - e) <= body.radius {
            return Err(PropagationError::elements(
                "a",
                a,
                "periapsis radius a(1-e) intersects the central body",
            ));
        }

        Ok(Self {
            a,
            e,
            i,
            raan: normalize_angle(raan),
            aop: normalize_angle(aop),
            ma: normalize_angle(ma),
        })
    }

    /// Build from angles in degrees.
    pub fn from_degrees(
        a: f64,
        e: f64,
        i_deg: f64,
        raan_deg: f64,
        aop_deg: f64,
        ma_deg: f64,
        body: &CentralBody,
    ) -> Result<Self, PropagationError> {
        Self::new(
            a,
            e,
            i_deg * DEG2RAD,
            raan_deg * DEG2RAD,
            aop_deg * DEG2RAD,
            ma_deg * DEG2RAD,
            body,
        )
    }

    /// Build from perigee/apogee altitudes (km) plus an explicit eccentricity.
    ///
    /// The altitudes only fix the semi-major axis: `a = (R + h_p + R + h_a) / 2`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_apsides(
        perigee_alt: f64,
        apogee_alt: f64,
        e: f64,
        i_deg: f64,
        raan_deg: f64,
        aop_deg: f64,
        ma_deg: f64,
        body: &CentralBody,
    ) -> Result<Self, PropagationError> {
        if apogee_alt < perigee_alt {
            return Err(PropagationError::elements(
                "apogee",
                apogee_alt,
                "apogee altitude is below perigee altitude",
            ));
        }
        let a = (body.radius + perigee_alt + body.radius + apogee_alt) / 2.0;
        Self::from_degrees(a, e, i_deg, raan_deg, aop_deg, ma_deg, body)
    }

    /// Semi-major axis (km).
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Eccentricity.
    pub fn e(&self) -> f64 {
        self.e
    }

    /// Inclination (rad).
    pub fn i(&self) -> f64 {
        self.i
    }

    /// Right ascension of the ascending node (rad).
    pub fn raan(&self) -> f64 {
        self.raan
    }

    /// Argument of periapsis (rad).
    pub fn aop(&self) -> f64 {
        self.aop
    }

    /// Mean anomaly at epoch (rad).
    pub fn ma(&self) -> f64 {
        self.ma
    }

    /// Mean motion n = sqrt(μ/a³) (rad/s).
    pub fn mean_motion(&self, mu: f64) -> f64 {
        (mu / self.a.powi(3)).sqrt()
    }

    /// Orbital period (seconds).
    pub fn period(&self, mu: f64) -> f64 {
        TAU / self.mean_motion(mu)
    }

    /// Mean anomaly after `dt` seconds, reduced into [0, 2π).
    pub fn mean_anomaly_at(&self, mu: f64, dt: f64) -> f64 {
        normalize_angle(self.ma + self.mean_motion(mu) * dt)
    }

    /// Semi-latus rectum p = a(1-e²) (km).
    pub fn semi_latus_rectum(&self) -> f64 {
        self.a * (1.0 - self.e.powi(2))
    }

    /// Periapsis radius (km).
    pub fn perigee_radius(&self) -> f64 {
        self.a * (1.0 - self.e)
    }

    /// Apoapsis radius (km).
    pub fn apogee_radius(&self) -> f64 {
        self.a * (1.0 + self.e)
    }

    /// Periapsis altitude above the body radius (km).
    pub fn perigee_altitude(&self, body: &CentralBody) -> f64 {
        body.altitude(self.perigee_radius())
    }

    /// Apoapsis altitude above the body radius (km).
    pub fn apogee_altitude(&self, body: &CentralBody) -> f64 {
        body.altitude(self.apogee_radius())
    }
}

/// Normalize angle to [0, 2π).
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % TAU;
    let a = if a < 0.0 { a + TAU } else { a };
    // -tiny + TAU rounds to TAU
    if a >= TAU { 0.0 } else { a }
}

/// Normalize angle to [-π, π).
pub fn normalize_angle_pm(angle: f64) -> f64 {
    let a = normalize_angle(angle);
    if a >= std::f64::consts::PI { a - TAU } else { a }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::EARTH;
    use approx::assert_relative_eq;

    fn leo1() -> OrbitalElements {
        OrbitalElements::from_apsides(
            423.0, 939.0, 0.0365331, 99.2936, 237.4020, 179.9420, 180.1886, &EARTH,
        )
        .unwrap()
    }

    #[test]
    fn test_apsides_fix_semi_major_axis() {
        let elems = leo1();
        assert_relative_eq!(elems.a(), R_EARTH + 681.0, epsilon = 1e-9);
        assert_relative_eq!(elems.i() * RAD2DEG, 99.2936, epsilon = 1e-10);
        assert_relative_eq!(elems.raan() * RAD2DEG, 237.4020, epsilon = 1e-10);
    }

    #[test]
    fn test_leo_period_about_98_minutes() {
        let period_min = leo1().period(MU_EARTH) / MINUTE;
        assert_relative_eq!(period_min, 98.4, epsilon = 0.5);
    }

    #[test]
    fn test_hyperbolic_eccentricity_rejected() {
        let err = OrbitalElements::from_degrees(R_EARTH + 700.0, 1.2, 10.0, 0.0, 0.0, 0.0, &EARTH)
            .unwrap_err();
        assert!(matches!(err, PropagationError::InvalidElements { field: "e", .. }));
    }

    #[test]
    fn test_negative_eccentricity_rejected() {
        let err = OrbitalElements::from_degrees(R_EARTH + 700.0, -0.01, 10.0, 0.0, 0.0, 0.0, &EARTH)
            .unwrap_err();
        assert_eq!(err.field(), Some("e"));
    }

    #[test]
    fn test_subsurface_perigee_rejected() {
        // a(1-e) = 6800 * 0.9 = 6120 km < R_EARTH
        let err = OrbitalElements::from_degrees(6800.0, 0.1, 10.0, 0.0, 0.0, 0.0, &EARTH)
            .unwrap_err();
        assert_eq!(err.field(), Some("a"));
    }

    #[test]
    fn test_non_finite_angle_rejected() {
        let err = OrbitalElements::new(R_EARTH + 700.0, 0.0, 0.5, f64::NAN, 0.0, 0.0, &EARTH)
            .unwrap_err();
        assert_eq!(err.field(), Some("raan"));
    }

    #[test]
    fn test_retrograde_limit_inclination() {
        assert!(OrbitalElements::new(R_EARTH + 700.0, 0.0, std::f64::consts::PI, 0.0, 0.0, 0.0, &EARTH).is_ok());
        let err = OrbitalElements::new(R_EARTH + 700.0, 0.0, 3.2, 0.0, 0.0, 0.0, &EARTH).unwrap_err();
        assert_eq!(err.field(), Some("i"));
    }

    #[test]
    fn test_angles_normalised_at_construction() {
        let elems =
            OrbitalElements::from_degrees(R_EARTH + 700.0, 0.0, 45.0, -90.0, 370.0, 750.0, &EARTH)
                .unwrap();
        assert_relative_eq!(elems.raan() * RAD2DEG, 270.0, epsilon = 1e-10);
        assert_relative_eq!(elems.aop() * RAD2DEG, 10.0, epsilon = 1e-10);
        assert_relative_eq!(elems.ma() * RAD2DEG, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inverted_apsides_rejected() {
        let err = OrbitalElements::from_apsides(900.0, 400.0, 0.01, 0.0, 0.0, 0.0, 0.0, &EARTH)
            .unwrap_err();
        assert_eq!(err.field(), Some("apogee"));
    }

    #[test]
    fn test_normalize_angle_ranges() {
        assert_relative_eq!(normalize_angle(-0.5), TAU - 0.5, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(TAU + 0.25), 0.25, epsilon = 1e-12);
        assert!(normalize_angle(-1e-18) < TAU);
        assert_relative_eq!(normalize_angle_pm(1.5 * std::f64::consts::PI), -0.5 * std::f64::consts::PI, epsilon = 1e-12);
    }
}
