//! WebAssembly exports for the normal map pipeline.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! ## Buffers
//!
//! Inputs are flat u8 buffers of `width * height * channels` bytes with
//! 1 (gray), 3 (RGB) or 4 (RGBA) channels. Outputs are flat RGB buffers of
//! `width * height * 3` bytes.

use ndarray::Array3;
use wasm_bindgen::prelude::*;

use crate::error::{NormalMapError, Result};
use crate::field::IntensityField;
use crate::filters::grayscale::luminance_u8;
use crate::params::Parameters;
use crate::pipeline::{compute_normal_map, NormalMapper};

fn to_js_err(err: NormalMapError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn field_from_flat(data: &[u8], width: usize, height: usize, channels: usize) -> Result<IntensityField> {
    let input = Array3::from_shape_vec((height, width, channels), data.to_vec())?;
    luminance_u8(input.view())
}

// ============================================================================
// One-shot
// ============================================================================

/// Compute an RGB normal map from a flat image buffer.
///
/// # Arguments
/// * `data` - Flat u8 pixels (length = width * height * channels)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - 1, 3 or 4
/// * `strength` - Z component of the raw normal
/// * `blur_kernel_size` - Gaussian window (even values use the next odd size)
/// * `blur_sigma` - Gaussian sigma, 0 for automatic
///
/// # Returns
/// Flat RGB bytes (length = width * height * 3)
#[wasm_bindgen]
pub fn compute_normal_map_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    strength: f32,
    blur_kernel_size: usize,
    blur_sigma: f32,
) -> std::result::Result<Vec<u8>, JsValue> {
    let field = field_from_flat(data, width, height, channels).map_err(to_js_err)?;
    let params = Parameters::new(strength, blur_kernel_size, blur_sigma);
    let result = compute_normal_map(field.view(), &params).map_err(to_js_err)?;
    Ok(result.into_raw_vec_and_offset().0)
}

// ============================================================================
// Cached (slider-driven)
// ============================================================================

/// Normal mapper that keeps blurred and gradient fields between updates.
///
/// Changing only `strength` skips the blur and gradient stages.
#[wasm_bindgen]
pub struct WasmNormalMapper {
    inner: NormalMapper,
}

#[wasm_bindgen]
impl WasmNormalMapper {
    #[wasm_bindgen(constructor)]
    pub fn new(
        data: &[u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> std::result::Result<WasmNormalMapper, JsValue> {
        let field = field_from_flat(data, width, height, channels).map_err(to_js_err)?;
        let inner = NormalMapper::new(field).map_err(to_js_err)?;
        Ok(WasmNormalMapper { inner })
    }

    /// Recompute with new parameters and return flat RGB bytes.
    pub fn update(
        &mut self,
        strength: f32,
        blur_kernel_size: usize,
        blur_sigma: f32,
    ) -> std::result::Result<Vec<u8>, JsValue> {
        let params = Parameters::new(strength, blur_kernel_size, blur_sigma);
        let result = self.inner.update(&params).map_err(to_js_err)?;
        Ok(result.iter().copied().collect())
    }
}
