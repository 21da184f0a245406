//! Fixed-step Keplerian propagation over a time grid.
//!
//! Each sample depends only on `(elements, μ, t_k)`: mean anomaly is
//! advanced analytically, Kepler's equation is solved for the true anomaly
//! and the Cartesian state is rebuilt from the elements. There is no state
//! carried between samples, which makes the loop trivially parallel.
//!
//! # Scheduling
//! - [`Schedule::Sequential`] computes samples one by one.
//! - [`Schedule::Parallel`] maps fixed-size chunks of the grid across the
//!   rayon pool and appends each chunk in epoch order.
//!
//! In both modes the progress observer sees indices in increasing order
//! and cancellation always leaves a contiguous prefix starting at index 0.
//!
//! # Failure policy
//! A Kepler non-convergence aborts the whole run with
//! [`PropagationError::NonConvergence`], naming the sample index and epoch.
//! Approximate values are never substituted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use crate::body::CentralBody;
use crate::constants::*;
use crate::elements::OrbitalElements;
use crate::error::PropagationError;
use crate::kepler::KeplerSolver;
use crate::state::StateVector;

/// Relative slack on `duration / step`: a few ULPs, enough for `0.3 / 0.1`.
const GRID_SLACK: f64 = 4.0 * f64::EPSILON;

/// Upper bound on grid size; anything larger is almost certainly a unit mistake.
pub const MAX_SAMPLES: usize = 50_000_000;

/// Default number of samples per parallel work unit.
pub const DEFAULT_CHUNK: usize = 1024;

// ── Time grid ──

/// Half-open fixed-step grid `t_k = k·Δt`, `k = 0 … ⌊T/Δt⌋ - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeGrid {
    duration: f64,
    step: f64,
    len: usize,
}

impl TimeGrid {
    /// Build a grid over `[0, duration)` with spacing `step` (both seconds).
    pub fn new(duration: f64, step: f64) -> Result<Self, PropagationError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(PropagationError::grid("duration", duration, "must be finite and > 0"));
        }
        if !step.is_finite() || step <= 0.0 {
            return Err(PropagationError::grid("step", step, "must be finite and > 0"));
        }
        if step > duration {
            return Err(PropagationError::grid(
                "step",
                step,
                "exceeds the duration, no samples would be produced",
            ));
        }

        let ratio = duration / step;
        let len = (ratio + ratio * GRID_SLACK).floor();
        if len > MAX_SAMPLES as f64 {
            return Err(PropagationError::grid(
                "step",
                step,
                "too small for the duration, grid exceeds the sample limit",
            ));
        }

        Ok(TimeGrid {
            duration,
            step,
            len: len as usize,
        })
    }

    /// Build a grid from a duration in days and a step in seconds.
    pub fn from_days(days: f64, step: f64) -> Result<Self, PropagationError> {
        Self::new(days * SOLAR_DAY, step)
    }

    /// Total span T (s).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Step Δt (s).
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false for a validated grid.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Epoch offset of sample `k` (s).
    pub fn epoch(&self, k: usize) -> f64 {
        k as f64 * self.step
    }

    /// All epoch offsets in order.
    pub fn epochs(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(move |k| self.epoch(k))
    }
}

// ── Samples ──

/// One propagated point of the series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PropagationSample {
    /// Position in the grid.
    pub index: usize,
    /// Time since start (s).
    pub epoch: f64,
    /// Inertial Cartesian state.
    pub state: StateVector,
    /// |r| - body radius (km).
    pub altitude: f64,
    /// Eccentricity recovered from the state vector.
    pub eccentricity: f64,
    /// Osculating periapsis altitude (km).
    pub perigee_altitude: f64,
    /// Mean anomaly at this epoch, in [0, 2π) (rad).
    pub mean_anomaly: f64,
    /// True anomaly at this epoch, in [0, 2π) (rad).
    pub true_anomaly: f64,
    /// |v| (km/s).
    pub speed: f64,
}

/// Whether a run covered its whole grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    Cancelled,
}

/// Epoch-ordered output of a run. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ephemeris {
    grid: TimeGrid,
    status: RunStatus,
    samples: Vec<PropagationSample>,
}

impl Ephemeris {
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    pub fn samples(&self) -> &[PropagationSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<PropagationSample> {
        self.samples
    }

    pub fn epochs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.epoch).collect()
    }

    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.samples.iter().map(|s| s.state.r).collect()
    }

    pub fn velocities(&self) -> Vec<[f64; 3]> {
        self.samples.iter().map(|s| s.state.v).collect()
    }

    pub fn altitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.altitude).collect()
    }

    pub fn eccentricities(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.eccentricity).collect()
    }

    pub fn perigee_altitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.perigee_altitude).collect()
    }

    pub fn speeds(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.speed).collect()
    }
}

// ── Run controls ──

/// Receives one call per completed sample, in increasing index order.
pub trait ProgressObserver {
    fn on_sample(&self, index: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize),
{
    fn on_sample(&self, index: usize, total: usize) {
        self(index, total)
    }
}

/// Shared flag requesting early termination of a run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How samples are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    #[default]
    Sequential,
    /// Chunked parallel map; `chunk` samples per unit.
    Parallel { chunk: usize },
}

impl Schedule {
    pub fn parallel() -> Self {
        Schedule::Parallel { chunk: DEFAULT_CHUNK }
    }
}

/// Optional side channels of a run. None of them affect numerical results.
#[derive(Clone, Copy, Default)]
pub struct RunOptions<'a> {
    pub schedule: Schedule,
    pub observer: Option<&'a dyn ProgressObserver>,
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> RunOptions<'a> {
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(CancellationToken::is_cancelled)
    }

    fn notify(&self, index: usize, total: usize) {
        if let Some(observer) = self.observer {
            observer.on_sample(index, total);
        }
    }
}

// ── Propagator ──

/// Two-body propagator for one element set around one body.
#[derive(Debug, Clone, Copy)]
pub struct Propagator {
    elements: OrbitalElements,
    body: CentralBody,
    solver: KeplerSolver,
}

impl Propagator {
    pub fn new(elements: OrbitalElements, body: CentralBody) -> Self {
        Propagator {
            elements,
            body,
            solver: KeplerSolver::default(),
        }
    }

    pub fn with_solver(mut self, solver: KeplerSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    pub fn body(&self) -> &CentralBody {
        &self.body
    }

    /// Mean motion n (rad/s).
    pub fn mean_motion(&self) -> f64 {
        self.elements.mean_motion(self.body.mu)
    }

    /// Compute the sample at grid position `index`, epoch offset `epoch` (s).
    pub fn sample_at(&self, index: usize, epoch: f64) -> Result<PropagationSample, PropagationError> {
        let mu = self.body.mu;
        let m = self.elements.mean_anomaly_at(mu, epoch);

        let solution = self
            .solver
            .solve(m, self.elements.e())
            .map_err(|source| PropagationError::NonConvergence { index, epoch, source })?;
        log::trace!("sample {index}: Kepler converged in {} iterations", solution.iterations);

        let state = StateVector::from_elements(&self.elements, mu, solution.true_anomaly);
        let eccentricity = state.eccentricity(mu);
        let deviation = (eccentricity - self.elements.e()).abs();
        if deviation > ECCENTRICITY_CHECK_TOLERANCE {
            log::warn!(
                "sample {index} (t = {epoch} s): recovered eccentricity {eccentricity:.12} deviates from {:.12} by {deviation:.3e}",
                self.elements.e()
            );
        }

        Ok(PropagationSample {
            index,
            epoch,
            state,
            altitude: state.altitude(&self.body),
            eccentricity,
            perigee_altitude: self.body.altitude(state.perigee_radius(mu)),
            mean_anomaly: solution.mean_anomaly,
            true_anomaly: solution.true_anomaly,
            speed: state.v_mag(),
        })
    }

    /// Propagate sequentially with no observer and no cancellation.
    pub fn propagate(&self, grid: &TimeGrid) -> Result<Ephemeris, PropagationError> {
        self.propagate_with(grid, &RunOptions::default())
    }

    /// Propagate over `grid` with explicit run controls.
    pub fn propagate_with(
        &self,
        grid: &TimeGrid,
        options: &RunOptions<'_>,
    ) -> Result<Ephemeris, PropagationError> {
        log::info!(
            "Propagating {} samples over {} s (step {} s, {:?})",
            grid.len(),
            grid.duration(),
            grid.step(),
            options.schedule
        );

        let (samples, status) = match options.schedule {
            Schedule::Sequential => self.run_sequential(grid, options)?,
            Schedule::Parallel { chunk } => self.run_parallel(grid, options, chunk.max(1))?,
        };

        match status {
            RunStatus::Complete => log::info!("Propagation complete: {} samples", samples.len()),
            RunStatus::Cancelled => log::warn!(
                "Propagation cancelled after {} of {} samples",
                samples.len(),
                grid.len()
            ),
        }

        Ok(Ephemeris {
            grid: *grid,
            status,
            samples,
        })
    }

    fn run_sequential(
        &self,
        grid: &TimeGrid,
        options: &RunOptions<'_>,
    ) -> Result<(Vec<PropagationSample>, RunStatus), PropagationError> {
        let total = grid.len();
        let mut samples = Vec::with_capacity(total);

        for k in 0..total {
            if options.cancelled() {
                return Ok((samples, RunStatus::Cancelled));
            }
            samples.push(self.sample_at(k, grid.epoch(k))?);
            options.notify(k, total);
        }

        Ok((samples, RunStatus::Complete))
    }

    fn run_parallel(
        &self,
        grid: &TimeGrid,
        options: &RunOptions<'_>,
        chunk: usize,
    ) -> Result<(Vec<PropagationSample>, RunStatus), PropagationError> {
        use rayon::prelude::*;

        let total = grid.len();
        let mut samples = Vec::with_capacity(total);
        let mut start = 0;

        while start < total {
            if options.cancelled() {
                return Ok((samples, RunStatus::Cancelled));
            }
            let end = (start + chunk).min(total);

            let results: Vec<_> = (start..end)
                .into_par_iter()
                .map(|k| self.sample_at(k, grid.epoch(k)))
                .collect();
            // Surface the earliest failure, not whichever worker lost the race.
            for result in results {
                samples.push(result?);
            }

            for k in start..end {
                options.notify(k, total);
            }
            start = end;
        }

        Ok((samples, RunStatus::Complete))
    }
}

/// Validate the grid and propagate sequentially.
pub fn propagate(
    elements: &OrbitalElements,
    body: &CentralBody,
    duration: f64,
    step: f64,
) -> Result<Ephemeris, PropagationError> {
    let grid = TimeGrid::new(duration, step)?;
    Propagator::new(*elements, *body).propagate(&grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::EARTH;
    use approx::assert_relative_eq;
    use std::cell::RefCell;

    fn leo1() -> OrbitalElements {
        OrbitalElements::from_apsides(
            423.0, 939.0, 0.0365331, 99.2936, 237.4020, 179.9420, 180.1886, &EARTH,
        )
        .unwrap()
    }

    fn circular() -> OrbitalElements {
        OrbitalElements::from_degrees(R_EARTH + 550.0, 0.0, 53.0, 10.0, 0.0, 42.0, &EARTH).unwrap()
    }

    #[test]
    fn test_grid_sample_count_and_spacing() {
        let grid = TimeGrid::from_days(0.2, 30.0).unwrap();
        assert_eq!(grid.len(), 576);
        let epochs: Vec<f64> = grid.epochs().collect();
        assert_eq!(epochs[0], 0.0);
        for pair in epochs.windows(2) {
            assert_relative_eq!(pair[1] - pair[0], 30.0, epsilon = 1e-9);
        }
        assert!(*epochs.last().unwrap() < grid.duration());
    }

    #[test]
    fn test_grid_floor_on_partial_step() {
        let grid = TimeGrid::new(100.0, 30.0).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(TimeGrid::new(30.0, 30.0).unwrap().len(), 1);
    }

    #[test]
    fn test_grid_floor_near_integer_ratio() {
        assert_eq!(TimeGrid::new(3.0 - 1e-9, 1.0).unwrap().len(), 2);
        assert_eq!(TimeGrid::new(100.0 - 1e-7, 10.0).unwrap().len(), 9);
        // 0.3 / 0.1 rounds to 2.9999999999999996
        assert_eq!(TimeGrid::new(0.3, 0.1).unwrap().len(), 3);
        assert_eq!(TimeGrid::from_days(0.2, 30.0).unwrap().len(), 576);
    }

    #[test]
    fn test_grid_rejects_bad_input() {
        let err = TimeGrid::new(100.0, 0.0).unwrap_err();
        assert!(matches!(err, PropagationError::InvalidGrid { field: "step", .. }));
        assert_eq!(TimeGrid::new(-5.0, 1.0).unwrap_err().field(), Some("duration"));
        assert_eq!(TimeGrid::new(f64::INFINITY, 1.0).unwrap_err().field(), Some("duration"));
        assert_eq!(TimeGrid::new(10.0, 60.0).unwrap_err().field(), Some("step"));
        assert_eq!(TimeGrid::new(1e9, 1e-3).unwrap_err().field(), Some("step"));
    }

    #[test]
    fn test_first_sample_matches_initial_elements() {
        let elems = leo1();
        let sample = Propagator::new(elems, EARTH).sample_at(0, 0.0).unwrap();
        assert_relative_eq!(sample.mean_anomaly, elems.ma(), epsilon = 1e-12);
        assert!(sample.altitude >= elems.perigee_altitude(&EARTH) - 1e-6);
        assert!(sample.altitude <= elems.apogee_altitude(&EARTH) + 1e-6);
    }

    #[test]
    fn test_circular_orbit_constant_altitude() {
        let eph = propagate(&circular(), &EARTH, 6000.0, 20.0).unwrap();
        assert_eq!(eph.len(), 300);
        for s in eph.samples() {
            assert!(s.eccentricity < 1e-10, "e = {}", s.eccentricity);
            assert_relative_eq!(s.altitude, 550.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_perigee_altitude_invariant() {
        let elems = leo1();
        let eph = propagate(&elems, &EARTH, 12000.0, 60.0).unwrap();
        let expected = elems.perigee_altitude(&EARTH);
        for s in eph.samples() {
            assert_relative_eq!(s.perigee_altitude, expected, epsilon = 1e-6);
            assert_relative_eq!(s.eccentricity, elems.e(), epsilon = ECCENTRICITY_CHECK_TOLERANCE);
        }
    }

    #[test]
    fn test_state_repeats_after_one_period() {
        let prop = Propagator::new(leo1(), EARTH);
        let period = leo1().period(EARTH.mu);
        let s0 = prop.sample_at(0, 0.0).unwrap();
        let s1 = prop.sample_at(1, period).unwrap();
        for k in 0..3 {
            assert_relative_eq!(s0.state.r[k], s1.state.r[k], epsilon = 1e-5);
            assert_relative_eq!(s0.state.v[k], s1.state.v[k], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_propagation_is_deterministic() {
        let grid = TimeGrid::new(7200.0, 45.0).unwrap();
        let prop = Propagator::new(leo1(), EARTH);
        assert_eq!(prop.propagate(&grid).unwrap(), prop.propagate(&grid).unwrap());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let grid = TimeGrid::new(7200.0, 10.0).unwrap();
        let prop = Propagator::new(leo1(), EARTH);
        let seq = prop.propagate(&grid).unwrap();
        let par = prop
            .propagate_with(&grid, &RunOptions::default().with_schedule(Schedule::Parallel { chunk: 37 }))
            .unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_observer_sees_every_index_in_order() {
        let grid = TimeGrid::new(3000.0, 30.0).unwrap();
        let prop = Propagator::new(leo1(), EARTH);

        for schedule in [Schedule::Sequential, Schedule::Parallel { chunk: 16 }] {
            let seen = RefCell::new(Vec::new());
            let observer = |index: usize, total: usize| {
                assert_eq!(total, 100);
                seen.borrow_mut().push(index);
            };
            let opts = RunOptions::default().with_schedule(schedule).with_observer(&observer);
            prop.propagate_with(&grid, &opts).unwrap();
            assert_eq!(seen.into_inner(), (0..100).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_cancellation_returns_prefix() {
        let grid = TimeGrid::new(3000.0, 30.0).unwrap();
        let prop = Propagator::new(leo1(), EARTH);
        let full = prop.propagate(&grid).unwrap();

        for (schedule, expected) in [
            (Schedule::Sequential, 10),
            (Schedule::Parallel { chunk: 8 }, 16),
        ] {
            let token = CancellationToken::new();
            let observer = |index: usize, _total: usize| {
                if index == 9 {
                    token.cancel();
                }
            };
            let opts = RunOptions::default()
                .with_schedule(schedule)
                .with_observer(&observer)
                .with_cancel(&token);
            let eph = prop.propagate_with(&grid, &opts).unwrap();

            assert_eq!(eph.status(), RunStatus::Cancelled);
            assert_eq!(eph.len(), expected);
            assert_eq!(eph.samples(), &full.samples()[..expected]);
        }
    }

    #[test]
    fn test_pre_cancelled_run_is_empty() {
        let grid = TimeGrid::new(600.0, 30.0).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let eph = Propagator::new(leo1(), EARTH)
            .propagate_with(&grid, &RunOptions::default().with_cancel(&token))
            .unwrap();
        assert!(eph.is_empty());
        assert!(!eph.is_complete());
    }

    #[test]
    fn test_non_convergence_aborts_with_epoch() {
        // a(1-e) = 8378 km * 0.9 clears the surface
        let elems =
            OrbitalElements::from_degrees(R_EARTH + 2000.0, 0.1, 20.0, 0.0, 0.0, 60.0, &EARTH)
                .unwrap();
        let grid = TimeGrid::new(600.0, 30.0).unwrap();
        let prop = Propagator::new(elems, EARTH).with_solver(KeplerSolver::new(1e-15, 1));

        for schedule in [Schedule::Sequential, Schedule::parallel()] {
            let err = prop
                .propagate_with(&grid, &RunOptions::default().with_schedule(schedule))
                .unwrap_err();
            assert!(matches!(err, PropagationError::NonConvergence { index: 0, .. }));
            assert_eq!(err.epoch(), Some(0.0));
        }
    }

    #[test]
    fn test_column_accessors_align() {
        let eph = propagate(&leo1(), &EARTH, 600.0, 60.0).unwrap();
        assert_eq!(eph.epochs().len(), 10);
        assert_eq!(eph.positions().len(), eph.altitudes().len());
        assert_eq!(eph.velocities()[3], eph.samples()[3].state.v);
        assert_relative_eq!(eph.speeds()[0], eph.samples()[0].state.v_mag());
    }
}
