use crate::config::{CompartmentSeeds, PopulationBalance, SimulationConfig, StopCondition};
use crate::model::{CompartmentalModel, RunStatus};
use crate::step_size::relative_change;
use proptest::prelude::*;

fn config(population: u64, contact: f64, recovery: f64, mortality: f64) -> SimulationConfig {
    SimulationConfig {
        t_step: 0.05,
        days: 100,
        ..SimulationConfig::with_per_capita_rates(population, contact, recovery, mortality)
            .expect("valid rates")
    }
}

#[test]
fn single_person_outbreak_ends_after_one_step() {
    let mut model = CompartmentalModel::new(config(1, 0.3, 0.1, 0.01)).expect("model");
    let outcome = model.run();
    assert_eq!(outcome.status, RunStatus::Eradicated);
    assert_eq!(outcome.steps, 1);
    assert!(outcome.peak.is_none());
    assert!(model.state().max_population_drift(1.0) < 0.04);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any outbreak with positive removal either dies out or never starts.
    #[test]
    fn prop_runs_terminate(
        population in 1_000u64..20_000,
        contact in 0.05f64..0.5,
        recovery in 0.05f64..0.2,
        mortality in 0.0f64..0.05,
    ) {
        let mut model = CompartmentalModel::new(config(population, contact, recovery, mortality))
            .expect("model");
        let outcome = model.run();
        prop_assert_eq!(outcome.status, RunStatus::Eradicated);
        prop_assert!(outcome.steps < model.config().max_steps);
    }

    /// Below 100 persons the one-person threshold is still reached, including when the
    /// whole population starts infected and S0 = 0.
    #[test]
    fn prop_small_populations_terminate(
        population in 1u64..100,
        contact in 0.05f64..0.5,
        recovery in 0.05f64..0.2,
        mortality in 0.0f64..0.05,
        all_infected in any::<bool>(),
    ) {
        let base = config(population, contact, recovery, mortality);
        let infected = if all_infected { population as f64 } else { 1.0 };
        let mut model = CompartmentalModel::new(SimulationConfig {
            seeds: CompartmentSeeds {
                infected,
                ..CompartmentSeeds::default()
            },
            ..base
        })
        .expect("model");
        let outcome = model.run();
        prop_assert_eq!(outcome.status, RunStatus::Eradicated);
        prop_assert!(outcome.steps < model.config().max_steps);
        if all_infected {
            prop_assert!(outcome.peak.is_none());
        }
        let drift = model.state().max_population_drift(population as f64);
        prop_assert!(drift < 0.2, "drift {} for N = {}", drift, population);
    }

    /// Clamping only ever adds a few hundredths of a person to the total.
    #[test]
    fn prop_population_drift_is_small(
        population in 1_000u64..20_000,
        contact in 0.15f64..0.5,
        recovery in 0.05f64..0.2,
        mortality in 0.0f64..0.05,
    ) {
        let mut model = CompartmentalModel::new(config(population, contact, recovery, mortality))
            .expect("model");
        model.run();
        let n = population as f64;
        prop_assert!(model.state().max_population_drift(n) < 0.01 * n);
    }

    #[test]
    fn prop_renormalized_total_is_exact(
        population in 1_000u64..20_000,
        contact in 0.15f64..0.5,
        recovery in 0.05f64..0.2,
    ) {
        let mut model = CompartmentalModel::new(SimulationConfig {
            balance: PopulationBalance::Renormalize,
            ..config(population, contact, recovery, 0.01)
        })
        .expect("model");
        model.run();
        let n = population as f64;
        prop_assert!(model.state().max_population_drift(n) < 1e-9 * n);
    }

    /// The peak recorded by a full run is the one a peak-stopping run sees.
    #[test]
    fn prop_peak_is_fixed_once_recorded(
        contact in 0.2f64..0.5,
        recovery in 0.05f64..0.15,
    ) {
        let full_config = config(5_000, contact, recovery, 0.01);
        let mut full = CompartmentalModel::new(full_config).expect("model");
        let mut early = CompartmentalModel::new(SimulationConfig {
            stop: StopCondition::AtPeak,
            ..full_config
        })
        .expect("model");

        let full_outcome = full.run();
        let early_outcome = early.run();
        prop_assert_eq!(early_outcome.status, RunStatus::PeakReached);
        prop_assert!(full_outcome.peak.is_some());
        prop_assert_eq!(full_outcome.peak, early_outcome.peak);
        let peak = full_outcome.peak.expect("peak");
        prop_assert!(peak.day <= full_outcome.final_day);
    }

    #[test]
    fn prop_relative_change_is_symmetric_at_zero(value in -1e6f64..1e6) {
        prop_assert_eq!(relative_change(value, value), 0.0);
        prop_assert!(relative_change(value, value * 0.5) >= 0.0);
    }
}
