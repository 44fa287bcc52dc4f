//! Stepped calibration runner.

use crate::{js_error, to_js};
use anyhow::{bail, Context};
use outbreak_core::calibration::CalibrationProgress;
use outbreak_core::{
    CalibrationResult, CalibrationSettings, Calibrator, ObservationPoint, ObservationSet,
    RateParameters,
};
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;

/// WASM-exported calibrator. Each `run_steps` call performs a batch of outer iterations
/// so the caller can report progress in between.
#[wasm_bindgen]
pub struct WasmCalibrationRunner {
    calibrator: Option<Calibrator>,
    progress: CalibrationProgress,
    result: Option<CalibrationResult>,
}

#[wasm_bindgen]
impl WasmCalibrationRunner {
    /// `observations` is a flat `[day, infected, recovered, dead, ...]` array.
    #[wasm_bindgen(constructor)]
    pub fn new(
        population: f64,
        contagious_rate: f64,
        recovery_rate: f64,
        mortality_rate: f64,
        observations: Vec<f64>,
        settings_val: JsValue,
    ) -> Result<WasmCalibrationRunner, JsValue> {
        console_error_panic_hook::set_once();

        let settings: CalibrationSettings = if settings_val.is_undefined() || settings_val.is_null()
        {
            CalibrationSettings::default()
        } else {
            from_value(settings_val)
                .map_err(|e| JsValue::from_str(&format!("Invalid calibration settings: {}", e)))?
        };
        let initial = RateParameters::new(contagious_rate, recovery_rate, mortality_rate);
        Self::build(population, initial, &observations, settings)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))
    }

    pub fn is_done(&self) -> bool {
        self.calibrator.as_ref().map_or(true, Calibrator::is_done)
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        self.advance(batch_size).map_err(js_error)?;
        to_js(&self.progress)
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        to_js(&self.progress)
    }

    /// Finishes the calibration (running the final model once) and returns the result.
    /// Unfinished runners return their current best effort.
    pub fn get_result(&mut self) -> Result<JsValue, JsValue> {
        self.finish().map_err(js_error)?;
        let result = self
            .result
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        to_js(result)
    }
}

impl WasmCalibrationRunner {
    fn build(
        population: f64,
        initial: RateParameters,
        observations: &[f64],
        settings: CalibrationSettings,
    ) -> anyhow::Result<Self> {
        if !(population.is_finite() && population >= 1.0 && population.fract() == 0.0) {
            bail!("population must be a positive whole number, got {}", population);
        }
        let population = population as u64;
        let points = parse_observations(observations)?;
        let observations =
            ObservationSet::new(points, population).context("invalid observations")?;
        let calibrator = Calibrator::new(population, initial, observations, settings)
            .context("calibration init failed")?;
        Ok(Self {
            progress: calibrator.progress(),
            calibrator: Some(calibrator),
            result: None,
        })
    }

    fn advance(&mut self, batch_size: u32) -> outbreak_core::Result<()> {
        let Some(calibrator) = self.calibrator.as_mut() else {
            return Ok(());
        };
        for _ in 0..batch_size {
            if calibrator.is_done() {
                break;
            }
            self.progress = calibrator.step()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> outbreak_core::Result<()> {
        if let Some(calibrator) = self.calibrator.take() {
            let result = calibrator.finish()?;
            self.progress.done = true;
            self.result = Some(result);
        }
        Ok(())
    }
}

/// Splits a flat `[day, infected, recovered, dead, ...]` array into observation points.
fn parse_observations(flat: &[f64]) -> anyhow::Result<Vec<ObservationPoint>> {
    if flat.is_empty() || flat.len() % 4 != 0 {
        bail!(
            "observations must be groups of [day, infected, recovered, dead], got {} values",
            flat.len()
        );
    }
    flat.chunks_exact(4)
        .map(|chunk| {
            let day = chunk[0];
            if !(day.is_finite() && day.fract() == 0.0) {
                bail!("observation day must be a whole number, got {}", day);
            }
            let count = |value: f64| -> anyhow::Result<u64> {
                if !(value.is_finite() && value >= 0.0 && value.fract() == 0.0) {
                    bail!("counts on day {} must be non-negative whole numbers", day);
                }
                Ok(value as u64)
            };
            Ok(ObservationPoint::new(
                day as i32,
                count(chunk[1])?,
                count(chunk[2])?,
                count(chunk[3])?,
            ))
        })
        .collect()
}
