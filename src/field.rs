//! Data containers passed between pipeline stages.
//!
//! Every stage allocates its output fresh; nothing is mutated in place
//! across passes. Fields are indexed `[[row, col]]`, i.e. `(height, width)`.

use ndarray::{Array2, Array3, ArrayView2};

use crate::error::{ensure_same_dim, NormalMapError, Result};

/// Single-channel sample grid of shape (height, width).
///
/// Source intensities keep their 0-255 scale; gradient fields are signed
/// and unbounded.
pub type IntensityField = Array2<f32>;

/// RGB normal map of shape (height, width, 3), red = x, green = y, blue = z.
pub type NormalMapImage = Array3<u8>;

/// Horizontal and vertical derivatives of one intensity field.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientPair {
    dx: Array2<f32>,
    dy: Array2<f32>,
}

impl GradientPair {
    /// Pair two derivative fields, rejecting mismatched shapes.
    pub fn new(dx: Array2<f32>, dy: Array2<f32>) -> Result<Self> {
        ensure_same_dim(dx.dim(), dy.dim())?;
        Ok(Self { dx, dy })
    }

    /// Rate of change along columns (left to right).
    pub fn dx(&self) -> ArrayView2<'_, f32> {
        self.dx.view()
    }

    /// Rate of change along rows (top to bottom).
    pub fn dy(&self) -> ArrayView2<'_, f32> {
        self.dy.view()
    }

    /// (height, width) shared by both fields.
    pub fn dim(&self) -> (usize, usize) {
        self.dx.dim()
    }

    pub fn into_parts(self) -> (Array2<f32>, Array2<f32>) {
        (self.dx, self.dy)
    }
}

/// Reject fields without pixels before any stage touches them.
pub fn ensure_non_empty(field: ArrayView2<f32>) -> Result<()> {
    let (height, width) = field.dim();
    if height == 0 || width == 0 {
        return Err(NormalMapError::InvalidInput(format!(
            "source image is empty ({}x{})",
            width, height
        )));
    }
    Ok(())
}

/// Widen an 8-bit grayscale image into an intensity field (0.0-255.0).
pub fn intensity_from_u8(input: ArrayView2<u8>) -> IntensityField {
    input.mapv(|v| v as f32)
}
