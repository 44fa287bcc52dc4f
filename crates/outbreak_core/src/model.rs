//! Stepped integration of the SIRD system with peak and eradication detection.

use crate::compartments::{Compartment, CompartmentValues, SirdSystem};
use crate::config::{
    PopulationBalance, SimulationConfig, StopCondition, ERADICATION_THRESHOLD, MIN_COMPARTMENT,
};
use crate::error::Result;
use crate::solvers::Stepper;
use crate::state::{DayRecord, PeakRecord, SimulationState};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// `run` has not been called yet.
    Pending,
    /// Stopped at the recorded peak (`StopCondition::AtPeak`).
    PeakReached,
    /// Infected count fell below one person while declining.
    Eradicated,
    /// Step ceiling reached before the stop condition held.
    IterationCeiling,
}

impl RunStatus {
    pub fn is_converged(self) -> bool {
        matches!(self, RunStatus::PeakReached | RunStatus::Eradicated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub steps: usize,
    pub final_day: f64,
    pub peak: Option<PeakRecord>,
}

impl RunOutcome {
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }
}

/// Closed-form SIR infection maximum for the configured rates and seeds.
///
/// Along a trajectory `I + S − ρ·ln S` is conserved with `ρ = (γ+μ)/β = N/R0`, and I peaks
/// when S has fallen to ρ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyticalPeak {
    pub susceptible_at_peak: f64,
    pub infected: f64,
}

pub struct CompartmentalModel {
    config: SimulationConfig,
    population: f64,
    basic_reproduction: f64,
    effective_reproduction: f64,
    state: SimulationState,
    peak: Option<PeakRecord>,
    status: RunStatus,
    steps: usize,
}

impl CompartmentalModel {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let population = config.population as f64;
        let seeds = config.seeds;
        let initial = CompartmentValues::new(
            population - seeds.total(),
            seeds.infected,
            seeds.recovered,
            seeds.dead,
        );
        let basic_reproduction = config.rates.basic_reproduction_number(population);
        let effective_reproduction = config
            .rates
            .effective_reproduction_number(population, initial.susceptible);

        Ok(Self {
            config,
            population,
            basic_reproduction,
            effective_reproduction,
            state: SimulationState::seeded(seeds.day, initial),
            peak: None,
            status: RunStatus::Pending,
            steps: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn peak(&self) -> Option<PeakRecord> {
        self.peak
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn basic_reproduction_number(&self) -> f64 {
        self.basic_reproduction
    }

    pub fn effective_reproduction_number(&self) -> f64 {
        self.effective_reproduction
    }

    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            status: self.status,
            steps: self.steps,
            final_day: self.day_at(self.steps),
            peak: self.peak,
        }
    }

    fn day_at(&self, step: usize) -> f64 {
        self.config.seeds.day + step as f64 * self.config.t_step
    }

    /// Integrates until the configured stop condition holds or `max_steps` is reached.
    ///
    /// A finished run is final: calling `run` again returns the same outcome.
    pub fn run(&mut self) -> RunOutcome {
        if self.status != RunStatus::Pending {
            debug!("run() called on a finished simulation ({:?})", self.status);
            return self.outcome();
        }

        let h = self.config.t_step;
        let block = self.config.steps_per_block();
        let max_steps = self.config.max_steps;
        let seed_infected = self.config.seeds.infected;
        let system = SirdSystem::new(self.config.rates);
        let mut stepper = self.config.scheme.build(Compartment::ALL.len());
        let mut block_end = block.min(max_steps);
        if self.config.verbose {
            info!(
                "running until {:?} with an order-{} scheme, t_step {} days, R0 {:.4}",
                self.config.stop,
                stepper.order(),
                h,
                self.basic_reproduction
            );
        }

        let mut current = match self.state.latest() {
            Some((_, values)) => values.to_array(),
            None => return self.outcome(),
        };

        loop {
            if self.steps >= block_end {
                if self.steps >= max_steps {
                    self.status = RunStatus::IterationCeiling;
                    warn!(
                        "simulation did not converge within {} steps (day {:.2}, infected {:.2})",
                        max_steps,
                        self.day_at(self.steps),
                        current[Compartment::Infected.index()]
                    );
                    break;
                }
                block_end = (block_end + block).min(max_steps);
                if self.config.verbose {
                    info!(
                        "{}-day budget exhausted at day {:.2} without eradication; extending",
                        self.config.days,
                        self.day_at(self.steps)
                    );
                }
            }

            let (flux, next) = self.advance(&mut stepper, &system, &current, h);
            self.steps += 1;
            let day = self.day_at(self.steps);
            self.state.push(day, flux, next);
            current = next.to_array();

            if self.peak.is_none() && flux.infected < 0.0 && next.infected > seed_infected {
                let peak = PeakRecord::rounded(day, next.infected);
                self.peak = Some(peak);
                if self.config.verbose {
                    info!(
                        "infection peak of {} persons at day {:.2}",
                        peak.magnitude, peak.day
                    );
                }
                if self.config.stop == StopCondition::AtPeak {
                    self.status = RunStatus::PeakReached;
                    break;
                }
            }

            // A declining outbreak that never rose above its seed also ends here.
            if flux.infected < 0.0 && next.infected < ERADICATION_THRESHOLD {
                self.status = RunStatus::Eradicated;
                if self.config.verbose {
                    info!(
                        "eradication reached at day {:.2} after {} steps",
                        day, self.steps
                    );
                }
                break;
            }
        }

        self.outcome()
    }

    fn advance(
        &self,
        stepper: &mut Stepper,
        system: &SirdSystem,
        current: &[f64; 4],
        h: f64,
    ) -> (CompartmentValues, CompartmentValues) {
        let mut t = self.day_at(self.steps);
        let mut next = *current;
        stepper.step(system, &mut t, &mut next, h);

        let mut flux = [0.0; 4];
        for i in 0..4 {
            flux[i] = (next[i] - current[i]) / h;
            next[i] = next[i].clamp(MIN_COMPARTMENT, self.population);
        }
        if self.config.balance == PopulationBalance::Renormalize {
            let total: f64 = next.iter().sum();
            let scale = self.population / total;
            for value in &mut next {
                *value *= scale;
            }
        }

        (
            CompartmentValues::from_array(flux),
            CompartmentValues::from_array(next),
        )
    }

    /// Every retained step as `(day, S, I, R, D)`.
    pub fn results(&self) -> Vec<DayRecord> {
        if !self.status.is_converged() {
            warn!(
                "reading results of a simulation that has not converged ({:?})",
                self.status
            );
        }
        self.state.records()
    }

    pub fn analytical_analogue(&self) -> AnalyticalPeak {
        let rates = &self.config.rates;
        let seeds = self.config.seeds;
        let s0 = self.population - seeds.total();
        let i0 = seeds.infected;

        if rates.contagious_rate <= 0.0 {
            return AnalyticalPeak {
                susceptible_at_peak: s0,
                infected: i0,
            };
        }
        let rho = rates.removal_rate() / rates.contagious_rate;
        if rho <= 0.0 {
            return AnalyticalPeak {
                susceptible_at_peak: 0.0,
                infected: i0 + s0,
            };
        }
        if s0 <= rho {
            return AnalyticalPeak {
                susceptible_at_peak: s0,
                infected: i0,
            };
        }
        AnalyticalPeak {
            susceptible_at_peak: rho,
            infected: i0 + s0 - rho - rho * (s0 / rho).ln(),
        }
    }
}

impl fmt::Display for CompartmentalModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        writeln!(f, "SIRD simulation")?;
        writeln!(f, "  time step:        {} days", c.t_step)?;
        writeln!(f, "  day budget:       {} days", c.days)?;
        writeln!(f, "  population:       {} persons", c.population)?;
        writeln!(f, "  contagious rate:  {:.6e} 1/(person·day)", c.rates.contagious_rate)?;
        writeln!(f, "  recovery rate:    {:.6} 1/day", c.rates.recovery_rate)?;
        writeln!(f, "  mortality rate:   {:.6} 1/day", c.rates.mortality_rate)?;
        writeln!(f, "  R0:               {:.4}", self.basic_reproduction)?;
        writeln!(f, "  R_eff:            {:.4}", self.effective_reproduction)?;
        writeln!(f, "  stop condition:   {:?}", c.stop)?;
        writeln!(f, "  balance:          {:?}", c.balance)?;
        write!(f, "  scheme:           {:?}", c.scheme)
    }
}
