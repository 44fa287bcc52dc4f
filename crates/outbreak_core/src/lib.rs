/// The `outbreak_core` crate is the numerical engine behind the outbreak tools.
///
/// Key components:
/// - **Traits**: `Scalar`, `DynamicalSystem` (right-hand sides) and `Steppable` (solvers).
/// - **Model**: `CompartmentalModel` integrates the SIRD equations until the infection
///   peak or eradication, extending its day budget in blocks.
/// - **Step size**: `optimize_step_size` halves the step until the peak is stable.
/// - **Calibration**: `Calibrator` fits the three rates to observed counts.
/// - **Growth**: `fit_growth_rates` estimates exponential trends from raw counts.
pub mod traits;
pub mod solvers;
pub mod error;
pub mod rates;
pub mod compartments;
pub mod config;
pub mod state;
pub mod model;
pub mod step_size;
pub mod observation;
pub mod calibration;
pub mod growth;

#[cfg(test)]
mod proptests;

pub use calibration::{calibrate, CalibrationResult, CalibrationSettings, Calibrator};
pub use config::{CompartmentSeeds, PopulationBalance, SimulationConfig, StopCondition};
pub use error::{OutbreakError, Result};
pub use growth::{fit_growth_rates, GrowthFit, GrowthSample};
pub use model::{CompartmentalModel, RunOutcome, RunStatus};
pub use observation::{ObservationPoint, ObservationSet};
pub use rates::RateParameters;
pub use step_size::{optimize_step_size, StepSizeSettings};
