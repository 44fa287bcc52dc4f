//! Recorded trajectory of a run.

use crate::compartments::{Compartment, CompartmentValues};
use serde::{Deserialize, Serialize};

/// Day and size of the infection maximum, as first detected during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    /// Rounded to two decimals.
    pub day: f64,
    /// Rounded to whole persons.
    pub magnitude: f64,
}

impl PeakRecord {
    pub(crate) fn rounded(day: f64, magnitude: f64) -> Self {
        Self {
            day: (day * 100.0).round() / 100.0,
            magnitude: magnitude.round(),
        }
    }
}

/// One retained step: `(day, S, I, R, D)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub day: f64,
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
    pub dead: f64,
}

impl DayRecord {
    pub fn as_tuple(&self) -> (f64, f64, f64, f64, f64) {
        (
            self.day,
            self.susceptible,
            self.infected,
            self.recovered,
            self.dead,
        )
    }
}

/// Compartment values for every step plus the flux that produced each step.
///
/// `fluxes[k]` is the rate of change applied between `values[k]` and `values[k + 1]`,
/// so there is always one fewer flux than values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationState {
    days: Vec<f64>,
    values: Vec<CompartmentValues>,
    fluxes: Vec<CompartmentValues>,
}

impl SimulationState {
    pub fn seeded(day: f64, initial: CompartmentValues) -> Self {
        Self {
            days: vec![day],
            values: vec![initial],
            fluxes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, day: f64, flux: CompartmentValues, values: CompartmentValues) {
        self.days.push(day);
        self.fluxes.push(flux);
        self.values.push(values);
    }

    /// Number of recorded snapshots, including the seed.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn days(&self) -> &[f64] {
        &self.days
    }

    pub fn values(&self) -> &[CompartmentValues] {
        &self.values
    }

    pub fn fluxes(&self) -> &[CompartmentValues] {
        &self.fluxes
    }

    pub fn initial(&self) -> Option<&CompartmentValues> {
        self.values.first()
    }

    pub fn latest(&self) -> Option<(f64, &CompartmentValues)> {
        Some((*self.days.last()?, self.values.last()?))
    }

    pub fn series(&self, compartment: Compartment) -> Vec<f64> {
        self.values.iter().map(|v| v.get(compartment)).collect()
    }

    pub fn flux_series(&self, compartment: Compartment) -> Vec<f64> {
        self.fluxes.iter().map(|v| v.get(compartment)).collect()
    }

    pub fn record(&self, index: usize) -> Option<DayRecord> {
        let day = *self.days.get(index)?;
        let v = self.values.get(index)?;
        Some(DayRecord {
            day,
            susceptible: v.susceptible,
            infected: v.infected,
            recovered: v.recovered,
            dead: v.dead,
        })
    }

    pub fn records(&self) -> Vec<DayRecord> {
        (0..self.len()).filter_map(|k| self.record(k)).collect()
    }

    /// Largest `|S+I+R+D − N|` over the run.
    pub fn max_population_drift(&self, population: f64) -> f64 {
        self.values
            .iter()
            .map(|v| (v.total() - population).abs())
            .fold(0.0, f64::max)
    }
}
