//! Per-run configuration for the compartmental model.
//!
//! Verbosity and the stop condition are per-run settings, so concurrent simulations
//! never influence each other.

use crate::error::{ensure_non_negative, ensure_positive, OutbreakError, Result};
use crate::rates::RateParameters;
use crate::solvers::IntegrationScheme;
use serde::{Deserialize, Serialize};

/// Hard ceiling on integration steps for a single run.
pub const DEFAULT_MAX_STEPS: usize = 500_000;

/// Lower clamp applied to every compartment after a step.
pub const MIN_COMPARTMENT: f64 = 0.01;

/// Infected count (persons) below which a declining outbreak counts as eradicated.
pub const ERADICATION_THRESHOLD: f64 = 1.0;

/// Day-0 state. Susceptibles are whatever remains of the population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompartmentSeeds {
    pub infected: f64,
    pub recovered: f64,
    pub dead: f64,
    pub day: f64,
}

impl Default for CompartmentSeeds {
    fn default() -> Self {
        Self {
            infected: 1.0,
            recovered: 0.0,
            dead: 0.0,
            day: 0.0,
        }
    }
}

impl CompartmentSeeds {
    pub fn total(&self) -> f64 {
        self.infected + self.recovered + self.dead
    }
}

/// When a run halts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopCondition {
    /// Halt as soon as the infection peak is recorded.
    AtPeak,
    /// Keep going past the peak until the infected count falls below one person.
    #[default]
    AtEradication,
}

/// How compartments are kept physical after each explicit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PopulationBalance {
    /// Clamp each compartment to `[MIN_COMPARTMENT, N]` independently. The sum drifts
    /// away from N by the clamped amounts.
    #[default]
    Clamp,
    /// Clamp, then rescale all compartments so they sum to N exactly.
    Renormalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Step size in days.
    pub t_step: f64,
    /// Day budget of one block; exhausted blocks are extended until `max_steps`.
    pub days: u32,
    pub population: u64,
    pub rates: RateParameters,
    pub seeds: CompartmentSeeds,
    pub stop: StopCondition,
    pub balance: PopulationBalance,
    pub scheme: IntegrationScheme,
    pub max_steps: usize,
    /// Emit `info!` progress lines for this run.
    pub verbose: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            t_step: 0.01,
            days: 100,
            population: 200_000,
            rates: RateParameters::new(0.0, 0.0, 0.0),
            seeds: CompartmentSeeds::default(),
            stop: StopCondition::default(),
            balance: PopulationBalance::default(),
            scheme: IntegrationScheme::default(),
            max_steps: DEFAULT_MAX_STEPS,
            verbose: false,
        }
    }
}

impl SimulationConfig {
    /// Population-normalised rates from a per-person contagious rate.
    pub fn with_per_capita_rates(
        population: u64,
        contact_rate: f64,
        recovery_rate: f64,
        mortality_rate: f64,
    ) -> Result<Self> {
        let rates = RateParameters::from_per_capita(
            contact_rate,
            recovery_rate,
            mortality_rate,
            population as f64,
        )?;
        Ok(Self {
            population,
            rates,
            ..Self::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("t_step", self.t_step)?;
        if self.days == 0 {
            return Err(OutbreakError::config("days must be at least 1"));
        }
        if self.population == 0 {
            return Err(OutbreakError::config("population must be positive"));
        }
        if self.max_steps == 0 {
            return Err(OutbreakError::config("max_steps must be at least 1"));
        }
        if self.t_step > f64::from(self.days) {
            return Err(OutbreakError::config(format!(
                "t_step {} exceeds the {}-day budget",
                self.t_step, self.days
            )));
        }
        self.rates.validate()?;

        ensure_positive("infected seed", self.seeds.infected)?;
        ensure_non_negative("recovered seed", self.seeds.recovered)?;
        ensure_non_negative("dead seed", self.seeds.dead)?;
        if !self.seeds.day.is_finite() {
            return Err(OutbreakError::config("seed day must be finite"));
        }
        if self.seeds.total() > self.population as f64 {
            return Err(OutbreakError::config(format!(
                "seeded compartments ({}) exceed the population ({})",
                self.seeds.total(),
                self.population
            )));
        }
        Ok(())
    }

    /// Number of steps covering one `days` block.
    pub fn steps_per_block(&self) -> usize {
        ((f64::from(self.days) / self.t_step).round() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        config.validate().expect("default config");
        assert_eq!(config.steps_per_block(), 10_000);
        assert_eq!(config.seeds, CompartmentSeeds::default());
    }

    #[test]
    fn validation_rejects_bad_inputs() {
        let base = SimulationConfig::with_per_capita_rates(1000, 0.3, 0.1, 0.0).expect("config");

        assert_err_contains(
            SimulationConfig { t_step: 0.0, ..base }.validate(),
            "t_step",
        );
        assert_err_contains(SimulationConfig { days: 0, ..base }.validate(), "days");
        assert_err_contains(
            SimulationConfig { population: 0, ..base }.validate(),
            "population",
        );
        assert_err_contains(
            SimulationConfig {
                rates: RateParameters::new(-1.0, 0.1, 0.0),
                ..base
            }
            .validate(),
            "contagious_rate",
        );
        assert_err_contains(
            SimulationConfig {
                seeds: CompartmentSeeds {
                    infected: 600.0,
                    recovered: 600.0,
                    ..CompartmentSeeds::default()
                },
                ..base
            }
            .validate(),
            "exceed the population",
        );
        assert_err_contains(
            SimulationConfig {
                seeds: CompartmentSeeds {
                    infected: 0.0,
                    ..CompartmentSeeds::default()
                },
                ..base
            }
            .validate(),
            "infected seed",
        );
        assert_err_contains(
            SimulationConfig { t_step: 5.0, days: 2, ..base }.validate(),
            "exceeds",
        );
    }

    #[test]
    fn per_capita_constructor_normalises() {
        let config = SimulationConfig::with_per_capita_rates(1000, 0.3, 0.1, 0.0).expect("config");
        assert!((config.rates.contagious_rate - 3e-4).abs() < 1e-18);
        assert!(SimulationConfig::with_per_capita_rates(0, 0.3, 0.1, 0.0).is_err());
    }
}
