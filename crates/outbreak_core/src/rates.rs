//! Transmission, recovery and mortality rates.

use crate::compartments::Compartment;
use crate::error::{ensure_non_negative, ensure_positive, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three rates driving the SIRD flux, all in 1/day.
///
/// `contagious_rate` is already divided by the population size, so the infection
/// flux is `contagious_rate · S · I` with S and I in persons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateParameters {
    pub contagious_rate: f64,
    pub recovery_rate: f64,
    pub mortality_rate: f64,
}

impl RateParameters {
    pub fn new(contagious_rate: f64, recovery_rate: f64, mortality_rate: f64) -> Self {
        Self {
            contagious_rate,
            recovery_rate,
            mortality_rate,
        }
    }

    /// Builds rates from a contagious rate expressed per person-day
    /// (contacts/day × transmission probability), normalising it by `population`.
    pub fn from_per_capita(
        contact_rate: f64,
        recovery_rate: f64,
        mortality_rate: f64,
        population: f64,
    ) -> Result<Self> {
        ensure_positive("population", population)?;
        let rates = Self::new(contact_rate / population, recovery_rate, mortality_rate);
        rates.validate()?;
        Ok(rates)
    }

    pub fn validate(&self) -> Result<()> {
        for rate in Rate::ALL {
            ensure_non_negative(rate.name(), self.get(rate))?;
        }
        Ok(())
    }

    pub fn get(&self, rate: Rate) -> f64 {
        match rate {
            Rate::Contagious => self.contagious_rate,
            Rate::Recovery => self.recovery_rate,
            Rate::Mortality => self.mortality_rate,
        }
    }

    pub fn set(&mut self, rate: Rate, value: f64) {
        match rate {
            Rate::Contagious => self.contagious_rate = value,
            Rate::Recovery => self.recovery_rate = value,
            Rate::Mortality => self.mortality_rate = value,
        }
    }

    /// Total outflow rate from the infected compartment, γ + μ.
    pub fn removal_rate(&self) -> f64 {
        self.recovery_rate + self.mortality_rate
    }

    /// R0 = β·N / (γ + μ). Infinite when nothing leaves the infected compartment.
    pub fn basic_reproduction_number(&self, population: f64) -> f64 {
        let removal = self.removal_rate();
        if removal <= 0.0 {
            return f64::INFINITY;
        }
        self.contagious_rate * population / removal
    }

    /// R_eff = R0 · S₀ / N.
    pub fn effective_reproduction_number(&self, population: f64, susceptible: f64) -> f64 {
        let r0 = self.basic_reproduction_number(population);
        if r0.is_infinite() {
            return r0;
        }
        r0 * susceptible / population
    }
}

impl fmt::Display for RateParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "contagious={:.6e} recovery={:.6} mortality={:.6}",
            self.contagious_rate, self.recovery_rate, self.mortality_rate
        )
    }
}

/// Tag for one of the three rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rate {
    Contagious,
    Recovery,
    Mortality,
}

impl Rate {
    pub const ALL: [Rate; 3] = [Rate::Contagious, Rate::Recovery, Rate::Mortality];

    pub fn name(self) -> &'static str {
        match self {
            Rate::Contagious => "contagious_rate",
            Rate::Recovery => "recovery_rate",
            Rate::Mortality => "mortality_rate",
        }
    }

    /// The compartment whose observed count calibrates this rate.
    pub fn observed_compartment(self) -> Compartment {
        match self {
            Rate::Contagious => Compartment::Infected,
            Rate::Recovery => Compartment::Recovered,
            Rate::Mortality => Compartment::Dead,
        }
    }
}
