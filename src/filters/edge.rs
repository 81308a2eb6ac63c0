//! Gradient stage: 5-tap Sobel derivatives of an intensity field.
//!
//! `dx` differentiates along columns and smooths along rows; `dy` is the
//! transpose. Borders replicate the nearest sample, so the first and last
//! rows and columns are well defined (a constant border yields zero).
//!
//! Responses are not normalized: a unit-slope ramp produces a derivative
//! of 128 (8 from the derivative taps times 16 from the smoothing taps).

use ndarray::ArrayView2;

use super::core::{convolve_separable, sobel_kernels_1d};
use crate::error::Result;
use crate::field::{ensure_non_empty, GradientPair};

/// Compute horizontal and vertical Sobel derivatives.
///
/// # Arguments
/// * `field` - Smoothed intensity field (height, width)
///
/// # Returns
/// [`GradientPair`] with both fields shaped like the input
pub fn sobel_gradients(field: ArrayView2<f32>) -> Result<GradientPair> {
    ensure_non_empty(field)?;

    let (derivative, smoothing) = sobel_kernels_1d();
    let dx = convolve_separable(field, &derivative, &smoothing);
    let dy = convolve_separable(field, &smoothing, &derivative);

    GradientPair::new(dx, dy)
}
