//! Observed outbreak counts used as calibration targets.

use crate::compartments::Compartment;
use crate::config::CompartmentSeeds;
use crate::error::{OutbreakError, Result};
use serde::{Deserialize, Serialize};

/// Cumulative counts reported on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationPoint {
    pub day: i32,
    pub infected: u64,
    pub recovered: u64,
    pub dead: u64,
}

impl ObservationPoint {
    pub fn new(day: i32, infected: u64, recovered: u64, dead: u64) -> Self {
        Self {
            day,
            infected,
            recovered,
            dead,
        }
    }

    /// Observed count for a compartment. Susceptibles are never observed.
    pub fn count(&self, compartment: Compartment) -> Option<f64> {
        match compartment {
            Compartment::Susceptible => None,
            Compartment::Infected => Some(self.infected as f64),
            Compartment::Recovered => Some(self.recovered as f64),
            Compartment::Dead => Some(self.dead as f64),
        }
    }

    fn total(&self) -> u64 {
        self.infected
            .saturating_add(self.recovered)
            .saturating_add(self.dead)
    }
}

impl From<(i32, u64, u64, u64)> for ObservationPoint {
    fn from((day, infected, recovered, dead): (i32, u64, u64, u64)) -> Self {
        Self::new(day, infected, recovered, dead)
    }
}

/// Validated observation series: non-empty, strictly ascending days, counts within the
/// population, and a first point with at least one infected person.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationSet {
    points: Vec<ObservationPoint>,
    population: u64,
}

impl ObservationSet {
    pub fn new(points: Vec<ObservationPoint>, population: u64) -> Result<Self> {
        let first = points
            .first()
            .ok_or_else(|| OutbreakError::observations("at least one observation is required"))?;
        if first.infected == 0 {
            return Err(OutbreakError::observations(format!(
                "the first observation (day {}) seeds the model and needs infected > 0",
                first.day
            )));
        }
        for pair in points.windows(2) {
            if pair[1].day <= pair[0].day {
                return Err(OutbreakError::observations(format!(
                    "days must be strictly ascending, got {} after {}",
                    pair[1].day, pair[0].day
                )));
            }
        }
        if let Some(point) = points.iter().find(|p| p.total() > population) {
            return Err(OutbreakError::observations(format!(
                "counts on day {} exceed the population of {}",
                point.day, population
            )));
        }
        Ok(Self { points, population })
    }

    pub fn points(&self) -> &[ObservationPoint] {
        &self.points
    }

    /// Population the counts were checked against.
    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Initial compartments taken from the first observation.
    pub fn seeds(&self) -> CompartmentSeeds {
        let first = &self.points[0];
        CompartmentSeeds {
            infected: first.infected as f64,
            recovered: first.recovered as f64,
            dead: first.dead as f64,
            day: f64::from(first.day),
        }
    }
}
