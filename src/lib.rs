//! # kepsim
//!
//! Two-body (Keplerian) orbit propagation over a fixed time grid.
//!
//! Classical elements are advanced analytically: the mean anomaly moves at
//! the mean motion, Kepler's equation is solved for the true anomaly, and
//! the inertial state is rebuilt through the perifocal frame. The output is
//! an epoch-ordered series of samples carrying position, velocity, altitude,
//! the eccentricity recovered from the state and the osculating perigee
//! altitude.
//!
//! # Example
//! ```
//! use kepsim::body::EARTH;
//! use kepsim::elements::OrbitalElements;
//! use kepsim::propagator::propagate;
//!
//! let elements = OrbitalElements::from_apsides(
//!     423.0, 939.0, 0.0365331, 99.2936, 237.4020, 179.9420, 180.1886, &EARTH,
//! ).unwrap();
//!
//! let ephemeris = propagate(&elements, &EARTH, 0.2 * 86400.0, 30.0).unwrap();
//! assert_eq!(ephemeris.len(), 576);
//! assert_eq!(ephemeris.samples()[0].epoch, 0.0);
//! ```

pub mod constants;
pub mod body;
pub mod error;
pub mod elements;
pub mod kepler;
pub mod state;
pub mod propagator;
pub mod catalog;
pub mod report;

pub use body::{CentralBody, EARTH};
pub use elements::OrbitalElements;
pub use error::PropagationError;
pub use propagator::{propagate, Ephemeris, PropagationSample, Propagator, TimeGrid};
pub use state::StateVector;

#[cfg(feature = "python")]
mod pybridge;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn kepsim(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pybridge::register(m)?;
    Ok(())
}
