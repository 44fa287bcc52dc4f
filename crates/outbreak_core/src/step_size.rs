//! Step-size search by successive halving.
//!
//! Each trial runs a fresh model that stops at the infection peak. The search ends
//! as soon as the peak day and magnitude both move by less than `tolerance`
//! (relative) between two consecutive halvings.

use crate::config::{SimulationConfig, StopCondition};
use crate::error::{ensure_positive, OutbreakError, Result};
use crate::model::CompartmentalModel;
use crate::state::PeakRecord;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HALVINGS: usize = 7;
pub const DEFAULT_STEP_TOLERANCE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepSizeSettings {
    /// First (largest) step tried, in days.
    pub h_max: f64,
    /// Relative change in peak day and magnitude accepted as stable.
    pub tolerance: f64,
    /// Number of trials, including the `h_max` baseline.
    pub max_halvings: usize,
}

impl Default for StepSizeSettings {
    fn default() -> Self {
        Self {
            h_max: 0.01,
            tolerance: DEFAULT_STEP_TOLERANCE,
            max_halvings: DEFAULT_MAX_HALVINGS,
        }
    }
}

impl StepSizeSettings {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("h_max", self.h_max)?;
        ensure_positive("step tolerance", self.tolerance)?;
        if self.max_halvings < 2 {
            return Err(OutbreakError::config(
                "max_halvings must allow at least one comparison (>= 2)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepTrial {
    pub step: f64,
    pub peak: Option<PeakRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSizeOutcome {
    /// Accepted step, or the smallest one tried when `converged` is false.
    pub step: f64,
    pub converged: bool,
    pub trials: Vec<StepTrial>,
}

impl StepSizeOutcome {
    pub fn final_peak(&self) -> Option<PeakRecord> {
        self.trials.last().and_then(|trial| trial.peak)
    }
}

/// `|new − old| / new`, with both-zero counted as no change and a zero `new` against a
/// non-zero `old` counted as unbounded change.
pub fn relative_change(new: f64, old: f64) -> f64 {
    if new == 0.0 {
        return if old == 0.0 { 0.0 } else { f64::INFINITY };
    }
    ((new - old) / new).abs()
}

fn peaks_agree(new: &PeakRecord, old: &PeakRecord, tolerance: f64) -> bool {
    relative_change(new.day, old.day) < tolerance
        && relative_change(new.magnitude, old.magnitude) < tolerance
}

/// Halves `settings.h_max` until the peak of `base` (rates, population, seeds) is stable.
///
/// `base.t_step`, `base.stop` and `base.verbose` are overridden for every trial.
pub fn optimize_step_size(
    base: &SimulationConfig,
    settings: &StepSizeSettings,
) -> Result<StepSizeOutcome> {
    settings.validate()?;

    let mut trials: Vec<StepTrial> = Vec::with_capacity(settings.max_halvings);
    let mut step = settings.h_max;

    for i in 0..settings.max_halvings {
        step = settings.h_max / 2f64.powi(i as i32);
        let mut model = CompartmentalModel::new(SimulationConfig {
            t_step: step,
            stop: StopCondition::AtPeak,
            verbose: false,
            ..*base
        })?;
        let peak = model.run().peak;
        debug!("step trial h = {:.6e}: peak {:?}", step, peak);

        let stable = match (peak, trials.last().and_then(|t| t.peak)) {
            (Some(new), Some(old)) => peaks_agree(&new, &old, settings.tolerance),
            _ => false,
        };
        trials.push(StepTrial { step, peak });

        if stable {
            debug!(
                "step converged at h_max/2^{} = {:.6e} (tolerance {}%)",
                i,
                step,
                100.0 * settings.tolerance
            );
            return Ok(StepSizeOutcome {
                step,
                converged: true,
                trials,
            });
        }
    }

    warn!(
        "step search did not reach the {}% tolerance after {} trials; using h = {:.6e}",
        100.0 * settings.tolerance,
        settings.max_halvings,
        step
    );
    Ok(StepSizeOutcome {
        step,
        converged: false,
        trials,
    })
}
