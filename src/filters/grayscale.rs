//! Grayscale conversion into an intensity field.
//!
//! Uses ITU-R BT.601 luma coefficients (the weights applied by common
//! image libraries when collapsing RGB to gray).
//!
//! ## Supported Formats
//!
//! - **Grayscale**: (height, width, 1) - copied directly
//! - **RGB**: (height, width, 3) - luma from RGB
//! - **RGBA**: (height, width, 4) - luma from RGB, alpha ignored

use ndarray::{Array2, ArrayView3, Axis};

use crate::error::{NormalMapError, Result};
use crate::field::IntensityField;

/// ITU-R BT.601 luma coefficients
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Convert a u8 image with 1, 3 or 4 channels into an intensity field.
///
/// # Arguments
/// * `input` - 3D array view of shape (height, width, channels), values 0-255
///
/// # Returns
/// Intensity field (height, width) on the 0.0-255.0 scale
pub fn luminance_u8(input: ArrayView3<u8>) -> Result<IntensityField> {
    let (height, width, channels) = input.dim();

    match channels {
        1 => Ok(input.index_axis(Axis(2), 0).mapv(|v| v as f32)),
        3 | 4 => {
            let mut output = Array2::<f32>::zeros((height, width));
            for y in 0..height {
                for x in 0..width {
                    let r = input[[y, x, 0]] as f32;
                    let g = input[[y, x, 1]] as f32;
                    let b = input[[y, x, 2]] as f32;
                    output[[y, x]] = LUMA_R * r + LUMA_G * g + LUMA_B * b;
                }
            }
            Ok(output)
        }
        found => Err(NormalMapError::InvalidInput(format!(
            "expected 1, 3 or 4 channels, found {}",
            found
        ))),
    }
}
