//! Core utilities for the filter stages.
//!
//! This module provides shared functionality used by the blur and gradient
//! stages:
//! - Gaussian kernel generation and the kernel-size-to-sigma rule
//! - The 5-tap Sobel kernel pair
//! - Separable correlation with replicated borders
//!
//! All kernels are applied as correlations: `out[i] = sum_k k[j] * in[i + j - half]`.
//! Samples outside the field repeat the nearest edge sample.

use ndarray::{Array2, ArrayView2, Zip};

/// 5-tap Sobel derivative taps.
pub const SOBEL5_DERIVATIVE: [f32; 5] = [-1.0, -2.0, 0.0, 2.0, 1.0];

/// 5-tap Sobel smoothing taps (binomial).
pub const SOBEL5_SMOOTHING: [f32; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];

/// Sigma derived from a kernel size when the caller passes 0.
///
/// `sigma = 0.3 * ((size - 1) * 0.5 - 1) + 0.8`, the common convention of
/// image libraries for auto-sized Gaussians. Size 1 yields 0.5, size 7 yields 1.4.
pub fn sigma_for_kernel_size(kernel_size: usize) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Generate a normalized 1D Gaussian kernel of a fixed size.
///
/// # Arguments
/// * `kernel_size` - Number of taps (odd)
/// * `sigma` - Standard deviation, must be positive
///
/// # Returns
/// Kernel whose taps sum to 1.0. A sigma too small to represent (its square
/// underflows) yields the identity kernel `[1.0]`.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f32) -> Vec<f32> {
    if kernel_size <= 1 {
        return vec![1.0];
    }

    let mean = (kernel_size - 1) as f32 / 2.0;
    let sigma_sq = sigma * sigma;
    if !sigma_sq.is_normal() {
        // Vanishing sigma: no smoothing
        return vec![1.0];
    }

    let mut kernel: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let x = i as f32 - mean;
            (-(x * x) / (2.0 * sigma_sq)).exp()
        })
        .collect();

    // Normalize
    let sum: f32 = kernel.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return vec![1.0];
    }
    kernel.iter_mut().for_each(|k| *k /= sum);

    kernel
}

/// The Sobel kernel pair for a 5x5 derivative.
///
/// # Returns
/// `(derivative, smoothing)` taps
pub fn sobel_kernels_1d() -> ([f32; 5], [f32; 5]) {
    (SOBEL5_DERIVATIVE, SOBEL5_SMOOTHING)
}

/// Whether `kernel` is odd-symmetric around its centre (`k[i] == -k[n - 1 - i]`).
///
/// Derivative kernels are; they are evaluated as sums of paired differences
/// so a constant neighbourhood yields exactly 0.0.
pub fn is_antisymmetric(kernel: &[f32]) -> bool {
    let n = kernel.len();
    n % 2 == 1 && (0..=n / 2).all(|i| kernel[i] == -kernel[n - 1 - i])
}

/// Correlate every row with `kernel` (horizontal pass).
///
/// Rows are processed in parallel.
pub fn correlate_rows(field: ArrayView2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (height, width) = field.dim();
    let mut output = Array2::<f32>::zeros((height, width));
    if height == 0 || width == 0 || kernel.is_empty() {
        return output;
    }

    debug_assert!(kernel.len() % 2 == 1, "kernel length must be odd");
    let half = kernel.len() / 2;
    let last = width as isize - 1;
    let antisymmetric = is_antisymmetric(kernel);
    let clamp = |x: usize, offset: isize| (x as isize + offset).clamp(0, last) as usize;

    Zip::from(output.rows_mut())
        .and(field.rows())
        .par_for_each(|mut out_row, in_row| {
            for x in 0..width {
                let mut sum = 0.0f32;
                if antisymmetric {
                    for j in 1..=half {
                        let d = j as isize;
                        sum += kernel[half + j] * (in_row[clamp(x, d)] - in_row[clamp(x, -d)]);
                    }
                } else {
                    for (ki, &kv) in kernel.iter().enumerate() {
                        sum += in_row[clamp(x, ki as isize - half as isize)] * kv;
                    }
                }
                out_row[x] = sum;
            }
        });

    output
}

/// Correlate every column with `kernel` (vertical pass).
///
/// Output rows are processed in parallel; each one accumulates whole
/// source rows so memory access stays sequential.
pub fn correlate_cols(field: ArrayView2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (height, width) = field.dim();
    let mut output = Array2::<f32>::zeros((height, width));
    if height == 0 || width == 0 || kernel.is_empty() {
        return output;
    }

    debug_assert!(kernel.len() % 2 == 1, "kernel length must be odd");
    let half = kernel.len() / 2;
    let last = height as isize - 1;
    let antisymmetric = is_antisymmetric(kernel);
    let clamp = |y: usize, offset: isize| (y as isize + offset).clamp(0, last) as usize;

    Zip::indexed(output.rows_mut()).par_for_each(|y, mut out_row| {
        if antisymmetric {
            for j in 1..=half {
                let d = j as isize;
                let kv = kernel[half + j];
                Zip::from(&mut out_row)
                    .and(field.row(clamp(y, d)))
                    .and(field.row(clamp(y, -d)))
                    .for_each(|o, &ahead, &behind| *o += kv * (ahead - behind));
            }
        } else {
            for (ki, &kv) in kernel.iter().enumerate() {
                out_row.scaled_add(kv, &field.row(clamp(y, ki as isize - half as isize)));
            }
        }
    });

    output
}

/// Separable 2D correlation: `kernel_x` along rows, then `kernel_y` along columns.
///
/// # Arguments
/// * `field` - Input samples (height, width)
/// * `kernel_x` - Odd-length taps applied horizontally
/// * `kernel_y` - Odd-length taps applied vertically
///
/// # Returns
/// New field with the same dimensions; the input is not modified
pub fn convolve_separable(field: ArrayView2<f32>, kernel_x: &[f32], kernel_y: &[f32]) -> Array2<f32> {
    let horizontal = correlate_rows(field, kernel_x);
    correlate_cols(horizontal.view(), kernel_y)
}
