//! WASM bridge exposing the DLP curve to the JavaScript presentation layer.

use anyhow::Context;
use dlp_core::{ChamberSampling, CurveModel, DyadicResolver};
use js_sys::Float64Array;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmCurve {
    model: CurveModel,
}

fn build_model(granularity: i32, width: i32) -> anyhow::Result<CurveModel> {
    CurveModel::from_parts(i64::from(granularity), i64::from(width)).with_context(|| {
        format!("Failed to build curve (granularity = {granularity}, width = {width})")
    })
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn flatten_points(points: impl Iterator<Item = (f64, f64)>) -> Vec<f64> {
    points.flat_map(|(x, y)| [x, y]).collect()
}

#[wasm_bindgen]
impl WasmCurve {
    #[wasm_bindgen(constructor)]
    pub fn new(granularity: i32, width: i32) -> Result<WasmCurve, JsValue> {
        console_error_panic_hook::set_once();
        let model = build_model(granularity, width).map_err(|e| to_js_error(format!("{e:#}")))?;
        Ok(WasmCurve { model })
    }

    pub fn granularity(&self) -> u32 {
        self.model.config().granularity
    }

    pub fn width(&self) -> u32 {
        self.model.config().width
    }

    pub fn point_count(&self) -> usize {
        self.model.boundary_points().len()
    }

    /// Interleaved `[x0, y0, x1, y1, ...]`, sorted by x.
    pub fn boundary_points(&self) -> Float64Array {
        let flat = flatten_points(self.model.boundary_points().iter().map(|p| (p.x, p.y)));
        Float64Array::from(flat.as_slice())
    }

    pub fn x_range(&self) -> Float64Array {
        let (min, max) = self.model.x_range();
        Float64Array::from([min, max].as_slice())
    }

    pub fn curve_estimate(&self, x: f64) -> Result<f64, JsValue> {
        self.model.curve_estimate(x).map_err(to_js_error)
    }

    pub fn is_above_curve(&self, x: f64, y: f64) -> Result<bool, JsValue> {
        self.model.is_above_curve(x, y).map_err(to_js_error)
    }

    pub fn segments(&self) -> Result<JsValue, JsValue> {
        serialize(&self.model.segments())
    }

    pub fn walls(&self) -> Result<JsValue, JsValue> {
        serialize(&self.model.walls())
    }

    pub fn fallbacks(&self) -> Result<JsValue, JsValue> {
        serialize(&self.model.fallbacks())
    }

    /// Points between the curve and `y_max`, interleaved as `[x, y, ...]`.
    pub fn chamber_samples(
        &self,
        x_min: f64,
        x_max: f64,
        x_count: u32,
        y_max: f64,
        y_count: u32,
    ) -> Result<Float64Array, JsValue> {
        let sampling = ChamberSampling {
            x_min,
            x_max,
            x_count: x_count as usize,
            y_max,
            y_count: y_count as usize,
        };
        let samples = self
            .model
            .chamber_samples(&sampling)
            .map_err(to_js_error)?;
        let flat = flatten_points(samples.iter().map(|p| (p.x, p.y)));
        Ok(Float64Array::from(flat.as_slice()))
    }
}

#[derive(Serialize)]
struct CharacterPayload {
    ch0: f64,
    ch1: f64,
    ch2: f64,
    slope: f64,
    discriminant: f64,
}

/// Chern character of `p / 2^m`. Integer parts are widened to `f64` for JavaScript.
#[wasm_bindgen]
pub fn resolve_character(p: f64, m: i32) -> Result<JsValue, JsValue> {
    if p.fract() != 0.0 || !p.is_finite() || p.abs() > 9_007_199_254_740_991.0 {
        return Err(JsValue::from_str("p must be a safe integer."));
    }
    let character = DyadicResolver::new()
        .resolve(p as i64, i64::from(m))
        .map_err(to_js_error)?;
    serialize(&CharacterPayload {
        ch0: character.ch0 as f64,
        ch1: character.ch1 as f64,
        ch2: character.ch2,
        slope: character.slope(),
        discriminant: character.discriminant(),
    })
}
