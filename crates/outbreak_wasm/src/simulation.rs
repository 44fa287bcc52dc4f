//! Single simulation runs and the step-size search.

use crate::{js_error, to_js};
use js_sys::Float64Array;
use outbreak_core::compartments::Compartment;
use outbreak_core::step_size::StepSizeSettings;
use outbreak_core::{CompartmentalModel, SimulationConfig};
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmSimulation {
    model: CompartmentalModel,
}

#[wasm_bindgen]
impl WasmSimulation {
    /// Builds a simulation from a `SimulationConfig` object. Missing fields take defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_val: JsValue) -> Result<WasmSimulation, JsValue> {
        console_error_panic_hook::set_once();
        let config = parse_config(config_val)?;
        let model = CompartmentalModel::new(config).map_err(js_error)?;
        Ok(WasmSimulation { model })
    }

    /// Convenience constructor taking the contagious rate per person.
    pub fn from_per_capita(
        population: f64,
        contact_rate: f64,
        recovery_rate: f64,
        mortality_rate: f64,
        t_step: f64,
    ) -> Result<WasmSimulation, JsValue> {
        console_error_panic_hook::set_once();
        if !(population.is_finite() && population >= 1.0 && population.fract() == 0.0) {
            return Err(JsValue::from_str(&format!(
                "population must be a positive whole number, got {}",
                population
            )));
        }
        let config = SimulationConfig {
            t_step,
            ..SimulationConfig::with_per_capita_rates(
                population as u64,
                contact_rate,
                recovery_rate,
                mortality_rate,
            )
            .map_err(js_error)?
        };
        let model = CompartmentalModel::new(config).map_err(js_error)?;
        Ok(WasmSimulation { model })
    }

    pub fn run(&mut self) -> Result<JsValue, JsValue> {
        let outcome = self.model.run();
        to_js(&outcome)
    }

    pub fn status(&self) -> String {
        format!("{:?}", self.model.status())
    }

    pub fn peak(&self) -> Result<JsValue, JsValue> {
        to_js(&self.model.peak())
    }

    pub fn analytical_peak(&self) -> Result<JsValue, JsValue> {
        to_js(&self.model.analytical_analogue())
    }

    pub fn basic_reproduction_number(&self) -> f64 {
        self.model.basic_reproduction_number()
    }

    pub fn effective_reproduction_number(&self) -> f64 {
        self.model.effective_reproduction_number()
    }

    pub fn days(&self) -> Float64Array {
        Float64Array::from(self.model.state().days())
    }

    /// Values of one compartment ("susceptible", "infected", "recovered" or "dead").
    pub fn series(&self, compartment: &str) -> Result<Float64Array, JsValue> {
        let compartment = compartment_by_name(compartment)?;
        Ok(Float64Array::from(
            self.model.state().series(compartment).as_slice(),
        ))
    }

    pub fn flux_series(&self, compartment: &str) -> Result<Float64Array, JsValue> {
        let compartment = compartment_by_name(compartment)?;
        Ok(Float64Array::from(
            self.model.state().flux_series(compartment).as_slice(),
        ))
    }

    /// Every step as `{ day, susceptible, infected, recovered, dead }`.
    pub fn results(&self) -> Result<JsValue, JsValue> {
        to_js(&self.model.results())
    }

    pub fn summary(&self) -> String {
        self.model.to_string()
    }
}

/// Runs the step-halving search for `config_val` and returns the full trial history.
#[wasm_bindgen]
pub fn optimize_step_size(config_val: JsValue, settings_val: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let config = parse_config(config_val)?;
    let settings: StepSizeSettings = if settings_val.is_undefined() || settings_val.is_null() {
        StepSizeSettings::default()
    } else {
        from_value(settings_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid step-size settings: {}", e)))?
    };
    let outcome = outbreak_core::optimize_step_size(&config, &settings).map_err(js_error)?;
    to_js(&outcome)
}

fn parse_config(config_val: JsValue) -> Result<SimulationConfig, JsValue> {
    from_value(config_val)
        .map_err(|e| JsValue::from_str(&format!("Invalid simulation config: {}", e)))
}

fn compartment_by_name(name: &str) -> Result<Compartment, JsValue> {
    Compartment::from_name(name)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown compartment: {}", name)))
}
