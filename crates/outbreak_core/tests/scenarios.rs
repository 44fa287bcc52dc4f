use outbreak_core::compartments::Compartment;
use outbreak_core::{
    calibrate, fit_growth_rates, optimize_step_size, CalibrationResult, CalibrationSettings,
    CompartmentSeeds, CompartmentalModel, GrowthSample, ObservationPoint, ObservationSet,
    RateParameters, RunStatus, SimulationConfig, StepSizeSettings,
};

fn small_town() -> SimulationConfig {
    SimulationConfig::with_per_capita_rates(1000, 0.3, 0.1, 0.0).expect("config")
}

#[test]
fn outbreak_peaks_then_dies_out() {
    let mut model = CompartmentalModel::new(SimulationConfig {
        days: 200,
        ..small_town()
    })
    .expect("model");
    let outcome = model.run();

    assert_eq!(outcome.status, RunStatus::Eradicated);
    let peak = outcome.peak.expect("peak");
    assert!((peak.day - 38.39).abs() < 1e-9);
    assert_eq!(peak.magnitude, 301.0);
    assert!(peak.magnitude < 1000.0);
    assert!((outcome.final_day - 117.14).abs() < 0.02);
    assert!(outcome.final_day < 200.0);
    let infected = model.state().series(Compartment::Infected);
    assert!(*infected.last().expect("series") < 1.0);
    assert_eq!(model.results().len(), outcome.steps + 1);
}

#[test]
fn clamped_population_stays_within_one_percent() {
    let mut model = CompartmentalModel::new(small_town()).expect("model");
    model.run();
    let drift = model.state().max_population_drift(1000.0);
    assert!(drift < 0.01 * 1000.0, "drift {drift}");
}

#[test]
fn default_search_settles_on_the_first_halving() {
    let config = SimulationConfig::with_per_capita_rates(1000, 0.3, 0.1, 0.01).expect("config");
    for tolerance in [0.2, 0.05, 0.01] {
        let outcome = optimize_step_size(
            &config,
            &StepSizeSettings {
                tolerance,
                ..StepSizeSettings::default()
            },
        )
        .expect("search");
        assert!(outcome.converged);
        assert_eq!(outcome.step, 0.005);
        let peak = outcome.final_peak().expect("peak");
        assert_eq!(peak.magnitude, 266.0);
        assert!((peak.day - 39.44).abs() < 0.011);
    }
}

#[test]
fn tighter_tolerance_never_picks_a_larger_step() {
    let config = SimulationConfig::with_per_capita_rates(1000, 0.3, 0.1, 0.01).expect("config");
    let search = |tolerance: f64| {
        optimize_step_size(
            &config,
            &StepSizeSettings {
                h_max: 1.0,
                tolerance,
                ..StepSizeSettings::default()
            },
        )
        .expect("search")
    };

    let loose = search(0.2);
    let medium = search(0.02);
    let tight = search(0.001);

    assert!(loose.converged && medium.converged);
    assert_eq!(loose.step, 0.5);
    assert_eq!(medium.step, 0.25);
    // Seven trials are not enough for 0.1%: the smallest step tried comes back.
    assert!(!tight.converged);
    assert_eq!(tight.step, 1.0 / 64.0);
    assert_eq!(tight.trials.len(), 7);
    assert!(tight.step < medium.step && medium.step < loose.step);
}

const POPULATION: u64 = 10_000;
const SEED: (i32, u64, u64, u64) = (40, 24, 29, 6);

fn true_rates() -> RateParameters {
    RateParameters::from_per_capita(0.2, 0.1, 0.02, POPULATION as f64).expect("rates")
}

/// Observations read off a run with the true rates, seeded like the calibration.
fn simulated_observations() -> ObservationSet {
    let t_step = 0.005;
    let seed = ObservationPoint::from(SEED);
    let mut model = CompartmentalModel::new(SimulationConfig {
        t_step,
        days: 200,
        population: POPULATION,
        rates: true_rates(),
        seeds: CompartmentSeeds {
            infected: seed.infected as f64,
            recovered: seed.recovered as f64,
            dead: seed.dead as f64,
            day: f64::from(seed.day),
        },
        ..SimulationConfig::default()
    })
    .expect("model");
    model.run();

    let mut points = vec![seed];
    for day in [60, 80, 100] {
        let index = (f64::from(day - seed.day) / t_step).round() as usize;
        let values = model.state().values()[index];
        points.push(ObservationPoint::new(
            day,
            values.infected.round() as u64,
            values.recovered.round() as u64,
            values.dead.round() as u64,
        ));
    }
    ObservationSet::new(points, POPULATION).expect("observations")
}

fn calibrate_from(scale: f64, data_tolerance: f64) -> CalibrationResult {
    let truth = true_rates();
    let initial = RateParameters::new(
        scale * truth.contagious_rate,
        scale * truth.recovery_rate,
        scale * truth.mortality_rate,
    );
    let settings = CalibrationSettings {
        data_tolerance,
        verbose: false,
        ..CalibrationSettings::default()
    };
    let result =
        calibrate(POPULATION, initial, simulated_observations(), settings).expect("calibration");
    assert_eq!(result.trace.len(), result.iterations);
    assert_eq!(result.trace.snapshots()[0], initial);
    assert_eq!(result.final_run.status, RunStatus::Eradicated);
    result
}

fn rate_errors(rates: &RateParameters) -> [f64; 3] {
    let truth = true_rates();
    let error = |fitted: f64, expected: f64| ((fitted - expected) / expected).abs();
    [
        error(rates.contagious_rate, truth.contagious_rate),
        error(rates.recovery_rate, truth.recovery_rate),
        error(rates.mortality_rate, truth.mortality_rate),
    ]
}

#[test]
fn simulated_observations_follow_the_model() {
    let observations = simulated_observations();
    let points = observations.points();
    assert_eq!(points[0], ObservationPoint::from(SEED));
    assert_eq!(points[3].day, 100);
    assert!(points[3].recovered > 1900 && points[3].recovered < 2100);
    for pair in points.windows(2) {
        assert!(pair[1].dead > pair[0].dead);
    }
}

#[test]
fn calibration_recovers_generating_rates_from_either_side() {
    for scale in [1.5, 0.5] {
        let result = calibrate_from(scale, 0.01);
        assert!(result.converged, "guess x{scale} did not converge");

        let errors = rate_errors(&result.rates);
        for error in errors {
            assert!(error < 0.05, "guess x{scale}: rate errors {errors:?}");
        }

        // The calibrated model reproduces every observation.
        let mut model = CompartmentalModel::new(SimulationConfig {
            t_step: result.t_step,
            days: 200,
            population: POPULATION,
            rates: result.rates,
            seeds: simulated_observations().seeds(),
            ..SimulationConfig::default()
        })
        .expect("model");
        model.run();
        for point in &simulated_observations().points()[1..] {
            let index = (f64::from(point.day - SEED.0) / result.t_step).round() as usize;
            let modeled = model.state().values()[index];
            for compartment in [Compartment::Infected, Compartment::Recovered, Compartment::Dead] {
                let observed = point.count(compartment).expect("observed");
                let deviation = (modeled.get(compartment) - observed).abs() / observed;
                assert!(deviation < 0.08, "day {}: {compartment:?} off by {deviation}", point.day);
            }
        }
    }
}

#[test]
fn loose_tolerance_bounds_each_update_not_the_fit() {
    // Convergence only says no observation proposes a rate change above
    // data_tolerance. The fitted rates can sit further from the truth than that.
    let result = calibrate_from(0.5, 0.05);
    assert!(result.converged);
    let [contagious, recovery, mortality] = rate_errors(&result.rates);
    assert!(contagious < 0.05 && recovery < 0.05);
    assert!(mortality < 0.15, "mortality error {mortality}");
}

#[test]
fn growth_fit_of_simulated_early_phase() {
    let mut model = CompartmentalModel::new(small_town()).expect("model");
    model.run();
    let state = model.state();
    let infected = state.series(Compartment::Infected);
    let recovered = state.series(Compartment::Recovered);

    // Cumulative cases over days 5..=20, sampled daily.
    let samples: Vec<GrowthSample> = (5..=20usize)
        .map(|day| {
            let i = day * 100;
            GrowthSample::new(day as f64, infected[i] + recovered[i], 0.0)
        })
        .collect();
    let fit = fit_growth_rates(&samples).expect("fit");

    // Early growth is close to (beta - gamma) = 0.2 per day in natural log.
    let natural_rate = fit.infection_rate * std::f64::consts::LN_10;
    assert!((natural_rate - 0.2).abs() < 0.03, "rate {natural_rate}");
}
