//! WASM bindings for `outbreak_core`.
//!
//! Configuration and results cross the boundary as plain JS objects through
//! `serde-wasm-bindgen`; long-running calibrations are exposed as stepped runners so the
//! caller can report progress between batches.

use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

mod calibration;
mod growth;
mod simulation;

pub use calibration::WasmCalibrationRunner;
pub use growth::{fit_growth_rates, rolling_growth_rates};
pub use simulation::{optimize_step_size, WasmSimulation};

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
