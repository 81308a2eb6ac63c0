//! Preview conversion for intermediate fields.
//!
//! Blurred and gradient fields are `f32` and (for gradients) signed. To
//! inspect them as images they are stretched linearly so the minimum maps
//! to 0 and the maximum to 255.

use ndarray::{Array2, ArrayView2};

/// Stretch a field to the full u8 range.
///
/// A constant (or empty) field has no range to stretch and maps to all zeros.
/// Non-finite samples are ignored when finding the range and map to 0.
pub fn stretch_to_u8(field: ArrayView2<f32>) -> Array2<u8> {
    let (min, max) = field
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return Array2::<u8>::zeros(field.dim());
    }

    let scale = 255.0 / range;
    field.mapv(|v| {
        if v.is_finite() {
            ((v - min) * scale).round().clamp(0.0, 255.0) as u8
        } else {
            0
        }
    })
}
