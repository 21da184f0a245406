//! Cartesian state vectors and the element → state reconstruction.
//!
//! Reconstruction works in two stages: position and velocity in the
//! perifocal (PQW) frame from `(p, e, ν, μ)`, then the 3-1-3 rotation
//! `R3(-Ω) R1(-i) R3(-ω)` into the inertial frame. Only resolved numbers are
//! consumed, so circular or equatorial orbits need no special casing.

use serde::Serialize;
use crate::body::CentralBody;
use crate::elements::OrbitalElements;

/// Cartesian state vector in the body-centred inertial frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateVector {
    /// Position (km): [x, y, z]
    pub r: [f64; 3],
    /// Velocity (km/s): [vx, vy, vz]
    pub v: [f64; 3],
}

impl StateVector {
    /// Reconstruct the state at true anomaly `nu` (rad).
    pub fn from_elements(elements: &OrbitalElements, mu: f64, nu: f64) -> Self {
        let (r_pqw, v_pqw) = perifocal_state(elements.semi_latus_rectum(), elements.e(), mu, nu);
        let rot = perifocal_to_inertial(elements.raan(), elements.i(), elements.aop());
        StateVector {
            r: rotate(&rot, &r_pqw),
            v: rotate(&rot, &v_pqw),
        }
    }

    /// Position magnitude (km).
    pub fn r_mag(&self) -> f64 {
        norm(&self.r)
    }

    /// Velocity magnitude (km/s).
    pub fn v_mag(&self) -> f64 {
        norm(&self.v)
    }

    /// Altitude above the body's reference radius (km).
    pub fn altitude(&self, body: &CentralBody) -> f64 {
        body.altitude(self.r_mag())
    }

    /// Specific orbital energy (km²/s²).
    pub fn energy(&self, mu: f64) -> f64 {
        self.v_mag().powi(2) / 2.0 - mu / self.r_mag()
    }

    /// Semi-major axis from vis-viva (km).
    pub fn sma(&self, mu: f64) -> f64 {
        -mu / (2.0 * self.energy(mu))
    }

    /// Specific angular momentum h = r × v (km²/s).
    pub fn angular_momentum(&self) -> [f64; 3] {
        cross(&self.r, &self.v)
    }

    /// Eccentricity vector, pointing at periapsis.
    ///
    /// e = ((v² - μ/r) r - (r·v) v) / μ
    pub fn eccentricity_vector(&self, mu: f64) -> [f64; 3] {
        let r_mag = self.r_mag();
        let v2 = dot(&self.v, &self.v);
        let rv = dot(&self.r, &self.v);
        let c_r = v2 - mu / r_mag;

        let mut e = [0.0; 3];
        for k in 0..3 {
            e[k] = (c_r * self.r[k] - rv * self.v[k]) / mu;
        }
        e
    }

    /// Osculating eccentricity recovered from the state.
    pub fn eccentricity(&self, mu: f64) -> f64 {
        norm(&self.eccentricity_vector(mu))
    }

    /// Osculating periapsis radius (km), `p / (1 + e)` with `p = h²/μ`.
    pub fn perigee_radius(&self, mu: f64) -> f64 {
        let h = norm(&self.angular_momentum());
        (h * h / mu) / (1.0 + self.eccentricity(mu))
    }
}

/// Position (km) and velocity (km/s) in the perifocal frame.
///
/// `p` is the semi-latus rectum; the orbital-plane radius is
/// `r = p / (1 + e cos ν)`.
pub fn perifocal_state(p: f64, e: f64, mu: f64, nu: f64) -> ([f64; 3], [f64; 3]) {
    let (sin_nu, cos_nu) = nu.sin_cos();
    let r_pf = p / (1.0 + e * cos_nu);
    let v_factor = (mu / p).sqrt();

    (
        [r_pf * cos_nu, r_pf * sin_nu, 0.0],
        [-v_factor * sin_nu, v_factor * (e + cos_nu), 0.0],
    )
}

/// Rotation matrix PQW → inertial for the 3-1-3 sequence (Ω, i, ω).
pub fn perifocal_to_inertial(raan: f64, i: f64, aop: f64) -> [[f64; 3]; 3] {
    let (sin_raan, cos_raan) = raan.sin_cos();
    let (sin_aop, cos_aop) = aop.sin_cos();
    let (sin_i, cos_i) = i.sin_cos();

    [
        [
            cos_raan * cos_aop - sin_raan * sin_aop * cos_i,
            -cos_raan * sin_aop - sin_raan * cos_aop * cos_i,
            sin_raan * sin_i,
        ],
        [
            sin_raan * cos_aop + cos_raan * sin_aop * cos_i,
            -sin_raan * sin_aop + cos_raan * cos_aop * cos_i,
            -cos_raan * sin_i,
        ],
        [sin_aop * sin_i, cos_aop * sin_i, cos_i],
    ]
}

fn rotate(rot: &[[f64; 3]; 3], x: &[f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for j in 0..3 {
        for k in 0..3 {
            out[j] += rot[j][k] * x[k];
        }
    }
    out
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
