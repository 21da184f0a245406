//! Python bindings via PyO3 for kepsim.
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::body::EARTH;
use crate::constants;
use crate::elements::OrbitalElements;
use crate::error::PropagationError;
use crate::propagator::{Propagator, RunOptions, Schedule, TimeGrid};

fn value_error(e: PropagationError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

// OrbitalElements
#[pyclass(name = "OrbitalElements")]
#[derive(Clone)]
pub struct PyOrbitalElements {
    pub(crate) inner: OrbitalElements,
}

#[pymethods]
impl PyOrbitalElements {
    /// Elements around Earth; `a` in km, angles in degrees.
    #[new]
    fn new(a: f64, e: f64, i_deg: f64, raan_deg: f64, aop_deg: f64, ma_deg: f64) -> PyResult<Self> {
        OrbitalElements::from_degrees(a, e, i_deg, raan_deg, aop_deg, ma_deg, &EARTH)
            .map(|inner| PyOrbitalElements { inner })
            .map_err(value_error)
    }

    /// Elements from perigee/apogee altitudes (km) and an explicit eccentricity.
    #[staticmethod]
    #[allow(clippy::too_many_arguments)]
    fn from_apsides(
        perigee_km: f64,
        apogee_km: f64,
        e: f64,
        i_deg: f64,
        raan_deg: f64,
        aop_deg: f64,
        ma_deg: f64,
    ) -> PyResult<Self> {
        OrbitalElements::from_apsides(perigee_km, apogee_km, e, i_deg, raan_deg, aop_deg, ma_deg, &EARTH)
            .map(|inner| PyOrbitalElements { inner })
            .map_err(value_error)
    }

    fn period(&self) -> f64 {
        self.inner.period(EARTH.mu)
    }

    fn perigee_altitude(&self) -> f64 {
        self.inner.perigee_altitude(&EARTH)
    }

    fn apogee_altitude(&self) -> f64 {
        self.inner.apogee_altitude(&EARTH)
    }

    #[getter] fn a(&self) -> f64 { self.inner.a() }
    #[getter] fn e(&self) -> f64 { self.inner.e() }
    #[getter] fn i_deg(&self) -> f64 { self.inner.i() * constants::RAD2DEG }
    #[getter] fn raan_deg(&self) -> f64 { self.inner.raan() * constants::RAD2DEG }
    #[getter] fn aop_deg(&self) -> f64 { self.inner.aop() * constants::RAD2DEG }
    #[getter] fn ma_deg(&self) -> f64 { self.inner.ma() * constants::RAD2DEG }

    fn __repr__(&self) -> String {
        format!(
            "OrbitalElements(a={:.3} km, e={:.7}, i={:.4}°, RAAN={:.4}°, AoP={:.4}°, MA={:.4}°)",
            self.inner.a(),
            self.inner.e(),
            self.inner.i() * constants::RAD2DEG,
            self.inner.raan() * constants::RAD2DEG,
            self.inner.aop() * constants::RAD2DEG,
            self.inner.ma() * constants::RAD2DEG,
        )
    }
}

/// Propagate over `[0, duration_s)` every `step_s` seconds.
///
/// Returns a dict of columns: epoch, position, velocity, altitude,
/// eccentricity, perigee_altitude, speed.
#[pyfunction]
#[pyo3(signature = (elements, duration_s, step_s, parallel=false))]
fn propagate<'py>(
    py: Python<'py>,
    elements: &PyOrbitalElements,
    duration_s: f64,
    step_s: f64,
    parallel: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let grid = TimeGrid::new(duration_s, step_s).map_err(value_error)?;
    let schedule = if parallel { Schedule::parallel() } else { Schedule::Sequential };
    let propagator = Propagator::new(elements.inner, EARTH);
    let ephemeris = py
        .allow_threads(|| propagator.propagate_with(&grid, &RunOptions::default().with_schedule(schedule)))
        .map_err(value_error)?;

    let dict = PyDict::new(py);
    dict.set_item("epoch", ephemeris.epochs())?;
    dict.set_item("position", ephemeris.positions().into_iter().map(Vec::from).collect::<Vec<_>>())?;
    dict.set_item("velocity", ephemeris.velocities().into_iter().map(Vec::from).collect::<Vec<_>>())?;
    dict.set_item("altitude", ephemeris.altitudes())?;
    dict.set_item("eccentricity", ephemeris.eccentricities())?;
    dict.set_item("perigee_altitude", ephemeris.perigee_altitudes())?;
    dict.set_item("speed", ephemeris.speeds())?;
    Ok(dict)
}

// Module registration
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyOrbitalElements>()?;
    m.add_function(wrap_pyfunction!(propagate, m)?)?;
    m.add("MU_EARTH", constants::MU_EARTH)?;
    m.add("R_EARTH", constants::R_EARTH)?;
    Ok(())
}
