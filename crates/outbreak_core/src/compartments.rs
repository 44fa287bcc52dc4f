//! The four SIRD compartments and the flux between them.

use crate::rates::RateParameters;
use crate::traits::DynamicalSystem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    Susceptible,
    Infected,
    Recovered,
    Dead,
}

impl Compartment {
    /// State-vector order used by the integrators.
    pub const ALL: [Compartment; 4] = [
        Compartment::Susceptible,
        Compartment::Infected,
        Compartment::Recovered,
        Compartment::Dead,
    ];

    pub fn index(self) -> usize {
        match self {
            Compartment::Susceptible => 0,
            Compartment::Infected => 1,
            Compartment::Recovered => 2,
            Compartment::Dead => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Compartment::Susceptible => "susceptible",
            Compartment::Infected => "infected",
            Compartment::Recovered => "recovered",
            Compartment::Dead => "dead",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// One value per compartment. Used both for populations and for their fluxes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompartmentValues {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
    pub dead: f64,
}

impl CompartmentValues {
    pub fn new(susceptible: f64, infected: f64, recovered: f64, dead: f64) -> Self {
        Self {
            susceptible,
            infected,
            recovered,
            dead,
        }
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.susceptible, self.infected, self.recovered, self.dead]
    }

    pub fn get(&self, compartment: Compartment) -> f64 {
        match compartment {
            Compartment::Susceptible => self.susceptible,
            Compartment::Infected => self.infected,
            Compartment::Recovered => self.recovered,
            Compartment::Dead => self.dead,
        }
    }

    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered + self.dead
    }
}

/// SIRD right-hand side:
///
/// ```text
/// dS = −β·s·i
/// dI =  β·s·i − (γ+μ)·i
/// dR =  γ·i
/// dD =  μ·i
/// ```
pub fn sird_flux(state: &CompartmentValues, rates: &RateParameters) -> CompartmentValues {
    let infections = rates.contagious_rate * state.susceptible * state.infected;
    let recoveries = rates.recovery_rate * state.infected;
    let deaths = rates.mortality_rate * state.infected;
    CompartmentValues {
        susceptible: -infections,
        infected: infections - recoveries - deaths,
        recovered: recoveries,
        dead: deaths,
    }
}

/// [`sird_flux`] behind the integrator interface.
#[derive(Debug, Clone, Copy)]
pub struct SirdSystem {
    pub rates: RateParameters,
}

impl SirdSystem {
    pub fn new(rates: RateParameters) -> Self {
        Self { rates }
    }
}

impl DynamicalSystem<f64> for SirdSystem {
    fn dimension(&self) -> usize {
        Compartment::ALL.len()
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let state = CompartmentValues::new(x[0], x[1], x[2], x[3]);
        let flux = sird_flux(&state, &self.rates);
        out.copy_from_slice(&flux.to_array());
    }
}
