//! Smoothing stage: separable Gaussian blur of an intensity field.
//!
//! Suppresses high-frequency noise before differentiation. Uses separable
//! 2-pass convolution with replicated borders.

use ndarray::ArrayView2;

use super::core::{convolve_separable, gaussian_kernel_1d, sigma_for_kernel_size};
use crate::error::Result;
use crate::field::IntensityField;
use crate::params::validate_blur;

/// Apply Gaussian blur to a single-channel field.
///
/// # Arguments
/// * `field` - Intensity field (height, width)
/// * `kernel_size` - Window extent; an even value is coerced to the next odd one
/// * `sigma` - Standard deviation, or 0 to derive it from `kernel_size`
///   (see [`sigma_for_kernel_size`])
///
/// # Returns
/// Blurred field with the same dimensions. Kernel size 1 returns a copy.
pub fn gaussian_blur(field: ArrayView2<f32>, kernel_size: usize, sigma: f32) -> Result<IntensityField> {
    validate_blur(kernel_size, sigma)?;

    let kernel_size = kernel_size | 1;
    if kernel_size == 1 {
        // No blur, return copy
        return Ok(field.to_owned());
    }

    let sigma = if sigma > 0.0 { sigma } else { sigma_for_kernel_size(kernel_size) };
    let kernel = gaussian_kernel_1d(kernel_size, sigma);
    log::trace!("gaussian blur: size={} sigma={:.3}", kernel_size, sigma);

    Ok(convolve_separable(field, &kernel, &kernel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NormalMapError;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn impulse(size: usize) -> Array2<f32> {
        let mut img = Array2::<f32>::zeros((size, size));
        img[[size / 2, size / 2]] = 255.0;
        img
    }

    #[test]
    fn test_kernel_one_is_identity() {
        let img = impulse(5);
        let out = gaussian_blur(img.view(), 1, 0.0).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_even_kernel_matches_next_odd() {
        let img = impulse(41);
        let even = gaussian_blur(img.view(), 30, 0.0).unwrap();
        let odd = gaussian_blur(img.view(), 31, 0.0).unwrap();
        assert_eq!(even, odd);
    }

    #[test]
    fn test_blur_spreads_impulse_and_preserves_mass() {
        let img = impulse(11);
        let out = gaussian_blur(img.view(), 5, 0.0).unwrap();
        assert!(out[[5, 5]] < 255.0);
        assert!(out[[5, 6]] > 0.0);
        assert_relative_eq!(out.sum(), 255.0, epsilon = 1e-2);
    }

    #[test]
    fn test_explicit_sigma_widens() {
        let img = impulse(15);
        let narrow = gaussian_blur(img.view(), 7, 0.5).unwrap();
        let wide = gaussian_blur(img.view(), 7, 3.0).unwrap();
        assert!(wide[[7, 7]] < narrow[[7, 7]]);
    }

    #[test]
    fn test_invalid_parameters() {
        let img = impulse(3);
        assert!(matches!(
            gaussian_blur(img.view(), 0, 0.0),
            Err(NormalMapError::InvalidParameter(_))
        ));
        assert!(matches!(
            gaussian_blur(img.view(), 3, -1.0),
            Err(NormalMapError::InvalidParameter(_))
        ));
    }
}
