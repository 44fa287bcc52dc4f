//! Gradient-free calibration of the SIRD rates against observed counts.
//!
//! Every iteration re-runs the step-size search with the current rates, integrates a full
//! outbreak, and derives one corrected rate set per observation:
//!
//! ```text
//! new = rate + rate · (observed − modeled) / max(observed, modeled)^1.2
//! ```
//!
//! (contagious rate against infected, recovery rate against recovered, mortality rate
//! against dead). The next iteration uses the per-rate median of those corrections. The
//! loop stops once every observation proposes a relative change below `data_tolerance`
//! for all three rates, or after `max_iterations`.

use crate::compartments::CompartmentValues;
use crate::config::{PopulationBalance, SimulationConfig, StopCondition, DEFAULT_MAX_STEPS};
use crate::error::{ensure_positive, OutbreakError, Result};
use crate::model::{CompartmentalModel, RunOutcome};
use crate::observation::{ObservationPoint, ObservationSet};
use crate::rates::{Rate, RateParameters};
use crate::solvers::IntegrationScheme;
use crate::step_size::{optimize_step_size, relative_change, StepSizeSettings};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CALIBRATION_STEPS: usize = 50;
pub const DEFAULT_CORRECTION_EXPONENT: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    pub max_iterations: usize,
    pub step: StepSizeSettings,
    /// Relative rate change below which an observation counts as matched.
    pub data_tolerance: f64,
    pub correction_exponent: f64,
    /// Day budget of each full run (extended in blocks until eradication).
    pub days: u32,
    pub balance: PopulationBalance,
    pub scheme: IntegrationScheme,
    pub max_steps: usize,
    /// Verbosity of the final reporting run. Runs inside the loop are always quiet.
    pub verbose: bool,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_CALIBRATION_STEPS,
            step: StepSizeSettings::default(),
            data_tolerance: 0.01,
            correction_exponent: DEFAULT_CORRECTION_EXPONENT,
            days: 200,
            balance: PopulationBalance::default(),
            scheme: IntegrationScheme::default(),
            max_steps: DEFAULT_MAX_STEPS,
            verbose: true,
        }
    }
}

impl CalibrationSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(OutbreakError::config("max_iterations must be at least 1"));
        }
        ensure_positive("data_tolerance", self.data_tolerance)?;
        ensure_positive("correction_exponent", self.correction_exponent)?;
        self.step.validate()
    }
}

/// Rate snapshots, one per calibration iteration, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationTrace {
    snapshots: Vec<RateParameters>,
}

impl CalibrationTrace {
    pub fn snapshots(&self) -> &[RateParameters] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn push(&mut self, rates: RateParameters) {
        self.snapshots.push(rates);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub done: bool,
    pub converged: bool,
    pub iteration: usize,
    pub max_iterations: usize,
    pub points_converged: usize,
    pub points: usize,
    pub t_step: Option<f64>,
    pub rates: RateParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub rates: RateParameters,
    pub trace: CalibrationTrace,
    /// False when `max_iterations` ran out; `rates` are then a best effort.
    pub converged: bool,
    pub iterations: usize,
    pub t_step: f64,
    pub final_run: RunOutcome,
}

/// Corrections proposed by one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PointCorrection {
    rates: RateParameters,
    within_tolerance: bool,
}

/// Stepwise calibrator; [`calibrate`] drives it to completion.
pub struct Calibrator {
    population: u64,
    observations: ObservationSet,
    settings: CalibrationSettings,
    rates: RateParameters,
    trace: CalibrationTrace,
    iterations: usize,
    points_converged: usize,
    last_step: Option<f64>,
    converged: bool,
    done: bool,
}

impl Calibrator {
    pub fn new(
        population: u64,
        initial: RateParameters,
        observations: ObservationSet,
        settings: CalibrationSettings,
    ) -> Result<Self> {
        settings.validate()?;
        if observations.population() != population {
            return Err(OutbreakError::observations(format!(
                "observations were validated against a population of {}, not {}",
                observations.population(),
                population
            )));
        }
        let calibrator = Self {
            population,
            observations,
            settings,
            rates: initial,
            trace: CalibrationTrace::default(),
            iterations: 0,
            points_converged: 0,
            last_step: None,
            converged: false,
            done: false,
        };
        // Fail on population, rates or seeds now rather than inside the loop.
        calibrator.base_config(initial).validate()?;
        Ok(calibrator)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn rates(&self) -> RateParameters {
        self.rates
    }

    pub fn trace(&self) -> &CalibrationTrace {
        &self.trace
    }

    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress {
            done: self.done,
            converged: self.converged,
            iteration: self.iterations,
            max_iterations: self.settings.max_iterations,
            points_converged: self.points_converged,
            points: self.observations.len(),
            t_step: self.last_step,
            rates: self.rates,
        }
    }

    fn base_config(&self, rates: RateParameters) -> SimulationConfig {
        SimulationConfig {
            t_step: self.settings.step.h_max,
            days: self.settings.days,
            population: self.population,
            rates,
            seeds: self.observations.seeds(),
            stop: StopCondition::AtEradication,
            balance: self.settings.balance,
            scheme: self.settings.scheme,
            max_steps: self.settings.max_steps,
            verbose: false,
        }
    }

    /// Runs one outer iteration. Does nothing once the calibrator is done.
    pub fn step(&mut self) -> Result<CalibrationProgress> {
        if self.done {
            return Ok(self.progress());
        }

        let base = self.base_config(self.rates);
        let search = optimize_step_size(&base, &self.settings.step)?;
        let h = search.step;
        let mut model = CompartmentalModel::new(SimulationConfig { t_step: h, ..base })?;
        model.run();

        self.trace.push(self.rates);
        self.last_step = Some(h);
        self.iterations += 1;

        let corrections: Vec<PointCorrection> = self
            .observations
            .points()
            .iter()
            .map(|point| self.correct(&model, point))
            .collect();
        self.points_converged = corrections.iter().filter(|c| c.within_tolerance).count();

        debug!(
            "calibration iteration {}: h = {:.6e}, {}/{} observations within tolerance, {}",
            self.iterations,
            h,
            self.points_converged,
            corrections.len(),
            self.rates
        );

        if self.points_converged == corrections.len() {
            self.converged = true;
            self.done = true;
            return Ok(self.progress());
        }

        for rate in Rate::ALL {
            let proposals: Vec<f64> = corrections.iter().map(|c| c.rates.get(rate)).collect();
            self.rates.set(rate, median(&proposals));
        }

        if self.iterations >= self.settings.max_iterations {
            self.done = true;
            warn!(
                "calibration did not converge in {} iterations; best effort {}",
                self.settings.max_iterations, self.rates
            );
        }
        Ok(self.progress())
    }

    fn correct(&self, model: &CompartmentalModel, point: &ObservationPoint) -> PointCorrection {
        let modeled = modeled_at(model, f64::from(point.day));
        let mut rates = self.rates;
        let mut within_tolerance = true;

        for rate in Rate::ALL {
            let compartment = rate.observed_compartment();
            let observed = point.count(compartment).unwrap_or(0.0);
            let current = self.rates.get(rate);
            let updated = corrected_rate(
                current,
                observed,
                modeled.get(compartment),
                self.settings.correction_exponent,
            );
            if relative_change(updated, current) >= self.settings.data_tolerance {
                within_tolerance = false;
            }
            rates.set(rate, updated);
        }

        PointCorrection {
            rates,
            within_tolerance,
        }
    }

    /// Runs the final model with the calibrated rates, logging at the configured verbosity.
    pub fn finish(self) -> Result<CalibrationResult> {
        if !self.done {
            debug!(
                "finishing calibration early after {} iterations",
                self.iterations
            );
        }
        let base = self.base_config(self.rates);
        let t_step = optimize_step_size(&base, &self.settings.step)?.step;
        let mut model = CompartmentalModel::new(SimulationConfig {
            t_step,
            verbose: self.settings.verbose,
            ..base
        })?;
        if self.settings.verbose {
            info!("calibrated model:\n{model}");
        }
        let final_run = model.run();

        if self.converged {
            if self.settings.verbose {
                info!(
                    "calibration converged after {} iterations: {}",
                    self.iterations, self.rates
                );
            }
        } else {
            warn!(
                "calibration result is a best effort after {} iterations",
                self.iterations
            );
        }

        Ok(CalibrationResult {
            rates: self.rates,
            trace: self.trace,
            converged: self.converged,
            iterations: self.iterations,
            t_step,
            final_run,
        })
    }
}

/// Calibrates `initial` against `observations` until convergence or the iteration budget.
pub fn calibrate(
    population: u64,
    initial: RateParameters,
    observations: ObservationSet,
    settings: CalibrationSettings,
) -> Result<CalibrationResult> {
    let mut calibrator = Calibrator::new(population, initial, observations, settings)?;
    while !calibrator.is_done() {
        calibrator.step()?;
    }
    calibrator.finish()
}

/// Model compartments nearest to `day`. Observations past the end of the run read the
/// final (post-eradication) state.
fn modeled_at(model: &CompartmentalModel, day: f64) -> CompartmentValues {
    let state = model.state();
    let h = model.config().t_step;
    let day0 = model.config().seeds.day;
    let last = state.len().saturating_sub(1);
    let index = (((day - day0) / h).round().max(0.0) as usize).min(last);
    if (state.days()[index] - day).abs() > h {
        debug!(
            "observation day {} lies beyond the run (last day {:.2}); using the final state",
            day,
            state.days()[index]
        );
    }
    state.values()[index]
}

/// One multiplicative correction step, floored at zero.
fn corrected_rate(rate: f64, observed: f64, modeled: f64, exponent: f64) -> f64 {
    let scale = observed.max(modeled);
    if scale <= 0.0 {
        return rate;
    }
    (rate + rate * (observed - modeled) / scale.powf(exponent)).max(0.0)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
