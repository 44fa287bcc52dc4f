//! Exponential growth fits over raw case counts.

use crate::{js_error, to_js};
use outbreak_core::growth::{self, GrowthSample};
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;

/// Fits `B · 10^(A·t)` to infections and deaths. `samples_val` is an array of
/// `{ day, infected, dead, active? }`; `day_min`/`day_max` optionally restrict the window.
#[wasm_bindgen]
pub fn fit_growth_rates(
    samples_val: JsValue,
    day_min: Option<f64>,
    day_max: Option<f64>,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let samples = windowed(parse_samples(samples_val)?, day_min, day_max);
    let fit = growth::fit_growth_rates(&samples).map_err(js_error)?;
    to_js(&fit)
}

/// Fits every centred window of `2·half_width + 1` samples.
#[wasm_bindgen]
pub fn rolling_growth_rates(samples_val: JsValue, half_width: u32) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let samples = parse_samples(samples_val)?;
    let fits = growth::rolling_growth_rates(&samples, half_width as usize).map_err(js_error)?;
    to_js(&fits)
}

fn parse_samples(samples_val: JsValue) -> Result<Vec<GrowthSample>, JsValue> {
    from_value(samples_val).map_err(|e| JsValue::from_str(&format!("Invalid samples: {}", e)))
}

fn windowed(
    samples: Vec<GrowthSample>,
    day_min: Option<f64>,
    day_max: Option<f64>,
) -> Vec<GrowthSample> {
    if day_min.is_none() && day_max.is_none() {
        return samples;
    }
    growth::select_window(
        &samples,
        day_min.unwrap_or(f64::NEG_INFINITY),
        day_max.unwrap_or(f64::INFINITY),
    )
}
