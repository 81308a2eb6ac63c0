//! NormalMap Rust
//!
//! Derives a per-pixel surface-normal map from a single grayscale image by
//! treating intensity as a height field. Implemented in Rust with optional
//! Python bindings via PyO3 and WASM bindings for JavaScript.
//!
//! ## Pipeline
//! Three stages run strictly forward:
//! 1. **Smoothing** - separable Gaussian blur ([`filters::blur`])
//! 2. **Gradients** - 5-tap Sobel derivatives ([`filters::edge`])
//! 3. **Synthesis** - `(-dx, dy, strength)` normalized and encoded as RGB ([`normals`])
//!
//! ## Image Format
//! - **Input**: intensity field (height, width) as `f32` on the 0-255 scale.
//!   [`filters::grayscale`] converts 1, 3 or 4 channel `u8` images.
//! - **Output**: normal map (height, width, 3) as `u8`, red = x, green = y, blue = z.
//!
//! ## Live Updates
//! [`NormalMapper`] caches intermediate fields so a strength change skips
//! blur and gradients. [`RecomputeWorker`] runs passes on a background
//! thread and coalesces bursts of parameter updates.

pub mod error;
pub mod field;
pub mod filters;
pub mod normals;
pub mod params;
pub mod pipeline;
pub mod recompute;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{NormalMapError, Result};
pub use field::{GradientPair, IntensityField, NormalMapImage};
pub use filters::core::convolve_separable;
pub use normals::normalize_vec3;
pub use params::{GradientConvention, Parameters};
pub use pipeline::{compute_normal_map, NormalMapper, PassKind};
pub use recompute::{RecomputeOutcome, RecomputeWorker};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray2, PyArray3, PyReadonlyArray2};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::error::NormalMapError;
    use crate::field::intensity_from_u8;
    use crate::filters::{blur, edge, visualize};
    use crate::params::{GradientConvention, Parameters};
    use crate::pipeline;

    fn to_py_err(err: NormalMapError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }

    // ========================================================================
    // Normal Map
    // ========================================================================

    /// Compute an RGB normal map from a grayscale u8 image.
    ///
    /// # Arguments
    /// * `image` - Grayscale image (height, width) as u8
    /// * `strength` - Z component of the raw normal (larger = flatter)
    /// * `blur_kernel_size` - Gaussian window, even values use the next odd size
    /// * `blur_sigma` - Gaussian sigma, 0 derives it from the kernel size
    /// * `convention` - "negate_x" or "negate_y"
    ///
    /// # Returns
    /// Normal map (height, width, 3) as u8
    #[pyfunction]
    #[pyo3(signature = (image, strength=30.0, blur_kernel_size=7, blur_sigma=0.0, convention="negate_x"))]
    pub fn compute_normal_map<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, u8>,
        strength: f32,
        blur_kernel_size: usize,
        blur_sigma: f32,
        convention: &str,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let convention: GradientConvention = convention.parse().map_err(to_py_err)?;
        let params = Parameters::new(strength, blur_kernel_size, blur_sigma).with_convention(convention);
        let field = intensity_from_u8(image.as_array());

        let result = py
            .allow_threads(move || pipeline::compute_normal_map(field.view(), &params))
            .map_err(to_py_err)?;
        Ok(result.into_pyarray(py))
    }

    // ========================================================================
    // Intermediate Stages
    // ========================================================================

    /// Gaussian blur of an f32 intensity field (height, width).
    #[pyfunction]
    #[pyo3(signature = (image, kernel_size=7, sigma=0.0))]
    pub fn gaussian_blur<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, f32>,
        kernel_size: usize,
        sigma: f32,
    ) -> PyResult<Bound<'py, PyArray2<f32>>> {
        let result = blur::gaussian_blur(image.as_array(), kernel_size, sigma).map_err(to_py_err)?;
        Ok(result.into_pyarray(py))
    }

    /// 5-tap Sobel derivatives of an f32 intensity field.
    ///
    /// Returns `(dx, dy)`.
    #[pyfunction]
    pub fn sobel_gradients<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, f32>,
    ) -> PyResult<(Bound<'py, PyArray2<f32>>, Bound<'py, PyArray2<f32>>)> {
        let gradients = edge::sobel_gradients(image.as_array()).map_err(to_py_err)?;
        let (dx, dy) = gradients.into_parts();
        Ok((dx.into_pyarray(py), dy.into_pyarray(py)))
    }

    /// Min-max stretch of an f32 field to u8 for previewing.
    #[pyfunction]
    pub fn preview_field<'py>(
        py: Python<'py>,
        field: PyReadonlyArray2<'py, f32>,
    ) -> Bound<'py, PyArray2<u8>> {
        visualize::stretch_to_u8(field.as_array()).into_pyarray(py)
    }

    /// NormalMap Rust extension module
    #[pymodule]
    pub fn normalmap(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(compute_normal_map, m)?)?;
        m.add_function(wrap_pyfunction!(gaussian_blur, m)?)?;
        m.add_function(wrap_pyfunction!(sobel_gradients, m)?)?;
        m.add_function(wrap_pyfunction!(preview_field, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::normalmap;
