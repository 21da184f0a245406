//! Kepler's equation and anomaly conversions for elliptic orbits.
//!
//! Solves `M = E - e sin(E)` by Newton-Raphson. The solver never returns an
//! unconverged value silently: running out of iterations yields
//! [`KeplerError::NonConvergence`] with the last iterate and its residual.

use thiserror::Error;
use crate::constants::TAU;
use crate::elements::normalize_angle;

/// Solver failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeplerError {
    #[error(
        "Kepler's equation did not converge after {iterations} iterations \
         (M = {mean_anomaly}, e = {eccentricity}, last E = {last_iterate}, residual = {residual:e})"
    )]
    NonConvergence {
        mean_anomaly: f64,
        eccentricity: f64,
        last_iterate: f64,
        residual: f64,
        iterations: usize,
    },

    #[error("Eccentricity {0} outside the elliptic range [0, 1)")]
    InvalidEccentricity(f64),
}

/// Result of a converged solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    /// Mean anomaly the solve was run for, reduced into [0, 2π) (rad)
    pub mean_anomaly: f64,
    /// Eccentric anomaly (rad)
    pub eccentric_anomaly: f64,
    /// True anomaly in [0, 2π) (rad)
    pub true_anomaly: f64,
    /// Newton iterations used
    pub iterations: usize,
}

/// Newton-Raphson solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolver {
    /// Convergence threshold on |E_{n+1} - E_n| (rad).
    pub tolerance: f64,
    /// Iteration bound before giving up.
    pub max_iterations: usize,
}

impl Default for KeplerSolver {
    fn default() -> Self {
        KeplerSolver {
            tolerance: 1e-10,
            max_iterations: 50,
        }
    }
}

impl KeplerSolver {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        KeplerSolver {
            tolerance,
            max_iterations,
        }
    }

    /// Solve for the eccentric anomaly. `m` may be any real value.
    ///
    /// Returns `(E, iterations)`. `e` must lie in [0, 1).
    pub fn eccentric_anomaly(&self, m: f64, e: f64) -> Result<(f64, usize), KeplerError> {
        if !(0.0..1.0).contains(&e) {
            return Err(KeplerError::InvalidEccentricity(e));
        }
        let m = normalize_angle(m);
        let mut ea = if e < 0.8 { m } else { std::f64::consts::PI };

        for iteration in 1..=self.max_iterations {
            let f = ea - e * ea.sin() - m;
            let fp = 1.0 - e * ea.cos();
            let delta = f / fp;
            ea -= delta;
            if delta.abs() < self.tolerance {
                return Ok((ea, iteration));
            }
        }

        Err(KeplerError::NonConvergence {
            mean_anomaly: m,
            eccentricity: e,
            last_iterate: ea,
            residual: kepler_residual(ea, e, m),
            iterations: self.max_iterations,
        })
    }

    /// Solve Kepler's equation and derive the true anomaly.
    pub fn solve(&self, m: f64, e: f64) -> Result<KeplerSolution, KeplerError> {
        let (ea, iterations) = self.eccentric_anomaly(m, e)?;
        Ok(KeplerSolution {
            mean_anomaly: normalize_angle(m),
            eccentric_anomaly: ea,
            true_anomaly: eccentric_to_true(ea, e),
            iterations,
        })
    }
}

/// `E - e sin(E) - M`.
pub fn kepler_residual(ea: f64, e: f64, m: f64) -> f64 {
    ea - e * ea.sin() - m
}

/// Eccentric anomaly → true anomaly in [0, 2π).
///
/// Two-argument arctangent on `(sqrt(1-e²) sin E, cos E - e)` keeps the
/// quadrant unambiguous.
pub fn eccentric_to_true(ea: f64, e: f64) -> f64 {
    let beta = (1.0 - e * e).sqrt();
    normalize_angle((beta * ea.sin()).atan2(ea.cos() - e))
}

/// True anomaly → eccentric anomaly in [0, 2π).
pub fn true_to_eccentric(nu: f64, e: f64) -> f64 {
    let beta = (1.0 - e * e).sqrt();
    normalize_angle((beta * nu.sin()).atan2(e + nu.cos()))
}

/// Eccentric anomaly → mean anomaly in [0, 2π).
pub fn eccentric_to_mean(ea: f64, e: f64) -> f64 {
    normalize_angle(ea - e * ea.sin())
}

/// Mean anomaly → true anomaly with the default solver.
pub fn mean_to_true(m: f64, e: f64) -> Result<f64, KeplerError> {
    KeplerSolver::default().solve(m, e).map(|s| s.true_anomaly)
}

/// Wrapped difference between two angles, in [0, π].
pub(crate) fn angular_distance(a: f64, b: f64) -> f64 {
    let d = normalize_angle(a - b);
    d.min(TAU - d)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Converged E satisfies Kepler's equation.
        #[test]
        fn prop_residual_below_tolerance(
            m in 0.0f64..TAU,
            e in 0.0f64..0.95,
        ) {
            let solver = KeplerSolver::default();
            let (ea, _) = solver.eccentric_anomaly(m, e).unwrap();
            prop_assert!(kepler_residual(ea, e, m).abs() < solver.tolerance);
        }

        /// M → E → ν → E → M reproduces M.
        #[test]
        fn prop_anomaly_round_trip(
            m in 0.0f64..TAU,
            e in 0.0f64..0.95,
        ) {
            let sol = KeplerSolver::default().solve(m, e).unwrap();
            let ea = true_to_eccentric(sol.true_anomaly, e);
            let m_back = eccentric_to_mean(ea, e);
            prop_assert!(angular_distance(m_back, m) < 1e-8);
        }

        /// True anomaly is always reported in [0, 2π).
        #[test]
        fn prop_true_anomaly_in_range(
            m in -20.0f64..20.0,
            e in 0.0f64..0.95,
        ) {
            let nu = mean_to_true(m, e).unwrap();
            prop_assert!((0.0..TAU).contains(&nu));
        }
    }
}
