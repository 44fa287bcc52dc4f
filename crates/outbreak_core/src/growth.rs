//! Exponential trend estimation from raw case and death counts.
//!
//! Fits `count(t) = B · 10^(A·t)` by ordinary least squares on `log10(count)`, which is
//! linear in `(A, log10 B)`. Deaths are offset by [`DEATH_OFFSET`] before the log so
//! early days with no deaths stay finite.

use crate::error::{OutbreakError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

pub const DEATH_OFFSET: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthSample {
    pub day: f64,
    pub infected: f64,
    pub dead: f64,
    #[serde(default)]
    pub active: Option<f64>,
}

impl GrowthSample {
    pub fn new(day: f64, infected: f64, dead: f64) -> Self {
        Self {
            day,
            infected,
            dead,
            active: None,
        }
    }

    pub fn with_active(mut self, active: f64) -> Self {
        self.active = Some(active);
        self
    }

    fn validate(&self) -> Result<()> {
        let malformed = |reason: &str| OutbreakError::MalformedSample {
            day: self.day,
            reason: reason.to_string(),
        };
        if !self.day.is_finite() {
            return Err(malformed("day is not finite"));
        }
        if !self.infected.is_finite() || self.infected <= 0.0 {
            return Err(malformed("infected count must be positive"));
        }
        if !self.dead.is_finite() || self.dead < 0.0 {
            return Err(malformed("dead count must be non-negative"));
        }
        if let Some(active) = self.active {
            if !active.is_finite() || active < 0.0 {
                return Err(malformed("active count must be non-negative"));
            }
        }
        Ok(())
    }
}

/// Result of [`fit_growth_rates`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthFit {
    /// Daily growth exponent A_i of infections (base 10).
    pub infection_rate: f64,
    /// Extrapolated infections at day 0, B_i.
    pub infection_origin: f64,
    pub death_rate: f64,
    pub death_origin: f64,
    /// Mean of dead/infected over the samples.
    pub mortality_mean: f64,
    /// Population standard deviation of dead/infected.
    pub mortality_std: f64,
}

impl GrowthFit {
    pub fn predict_infected(&self, day: f64) -> f64 {
        self.infection_origin * 10f64.powf(self.infection_rate * day)
    }

    pub fn predict_dead(&self, day: f64) -> f64 {
        self.death_origin * 10f64.powf(self.death_rate * day)
    }

    /// Days for infections to double at the fitted rate.
    pub fn doubling_time(&self) -> f64 {
        if self.infection_rate <= 0.0 {
            return f64::INFINITY;
        }
        2f64.log10() / self.infection_rate
    }
}

pub fn fit_growth_rates(samples: &[GrowthSample]) -> Result<GrowthFit> {
    if samples.len() < 2 {
        return Err(OutbreakError::DegenerateFit(format!(
            "at least two samples are required, got {}",
            samples.len()
        )));
    }
    for sample in samples {
        sample.validate()?;
    }

    let days: Vec<f64> = samples.iter().map(|s| s.day).collect();
    let log_infected: Vec<f64> = samples.iter().map(|s| s.infected.log10()).collect();
    let log_dead: Vec<f64> = samples
        .iter()
        .map(|s| (s.dead + DEATH_OFFSET).log10())
        .collect();

    let (infection_rate, infection_intercept) = fit_line(&days, &log_infected)?;
    let (death_rate, death_intercept) = fit_line(&days, &log_dead)?;

    let ratios = DVector::from_iterator(
        samples.len(),
        samples.iter().map(|s| s.dead / s.infected),
    );

    Ok(GrowthFit {
        infection_rate,
        infection_origin: 10f64.powf(infection_intercept),
        death_rate,
        death_origin: 10f64.powf(death_intercept),
        mortality_mean: ratios.mean(),
        // Population variance (divides by n).
        mortality_std: ratios.variance().sqrt(),
    })
}

/// Least-squares `y = slope·x + intercept`.
fn fit_line(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    let first = x[0];
    if x.iter().all(|&day| day == first) {
        return Err(OutbreakError::DegenerateFit(
            "all samples fall on the same day".to_string(),
        ));
    }

    let n = x.len();
    let mut design = DMatrix::from_element(n, 2, 1.0);
    for (row, &day) in x.iter().enumerate() {
        design[(row, 0)] = day;
    }
    let rhs = DVector::from_column_slice(y);

    let svd = design.svd(true, true);
    let beta = svd
        .solve(&rhs, 1e-12)
        .map_err(|e| OutbreakError::DegenerateFit(e.to_string()))?;
    if !beta.iter().all(|v| v.is_finite()) {
        return Err(OutbreakError::DegenerateFit(
            "non-finite regression coefficients".to_string(),
        ));
    }
    Ok((beta[0], beta[1]))
}

/// Samples whose day lies in `[day_min, day_max]`.
pub fn select_window(samples: &[GrowthSample], day_min: f64, day_max: f64) -> Vec<GrowthSample> {
    samples
        .iter()
        .filter(|s| s.day >= day_min && s.day <= day_max)
        .copied()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowFit {
    pub center_day: f64,
    pub fit: GrowthFit,
}

/// Fits every centred window of `2·half_width + 1` consecutive samples.
pub fn rolling_growth_rates(samples: &[GrowthSample], half_width: usize) -> Result<Vec<WindowFit>> {
    if half_width == 0 {
        return Err(OutbreakError::DegenerateFit(
            "rolling windows need half_width >= 1".to_string(),
        ));
    }
    let width = 2 * half_width + 1;
    samples
        .windows(width)
        .map(|window| {
            Ok(WindowFit {
                center_day: window[half_width].day,
                fit: fit_growth_rates(window)?,
            })
        })
        .collect()
}
