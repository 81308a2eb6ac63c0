//! Normal synthesis: per-pixel normals from a gradient pair.
//!
//! For each pixel the raw vector is built from the two derivatives and the
//! depth strength (signs per [`GradientConvention`]), normalized to unit
//! length and encoded as RGB:
//!
//! | Component | Range   | Channel | Encoded   |
//! |-----------|---------|---------|-----------|
//! | x         | -1..1   | Red     | 0..255    |
//! | y         | -1..1   | Green   | 0..255    |
//! | z         | 0..1    | Blue    | 128..255  |
//!
//! `byte = round((c / 2 + 0.5) * 255)`, clamped. A flat region encodes as
//! (128, 128, 255).
//!
//! A zero-length raw vector (zero strength on a flat region) or a
//! non-finite one falls back to the flat normal `(0, 0, 1)`; it never fails
//! the pass.
//!
//! Pixels are independent, so the loop runs in parallel with disjoint writes.

use ndarray::{Array3, ArrayView2, ArrayViewMut3, Axis, Zip};

use crate::error::{ensure_same_dim, NormalMapError, Result};
use crate::field::{GradientPair, NormalMapImage};
use crate::params::{validate_strength, GradientConvention};

/// Normal of a flat surface facing the viewer.
pub const FLAT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// Normalize a 3-vector to unit Euclidean length.
///
/// Returns [`FLAT_NORMAL`] when the input has zero length or contains
/// non-finite components. The length is accumulated in f64 so large
/// gradients do not overflow.
#[inline]
pub fn normalize_vec3(v: [f32; 3]) -> [f32; 3] {
    let [x, y, z] = v.map(f64::from);
    let len = (x * x + y * y + z * z).sqrt();
    if !len.is_finite() || len == 0.0 {
        return FLAT_NORMAL;
    }
    [(x / len) as f32, (y / len) as f32, (z / len) as f32]
}

/// Raw (unnormalized) normal for one pixel.
#[inline]
pub fn raw_normal(dx: f32, dy: f32, strength: f32, convention: GradientConvention) -> [f32; 3] {
    let (sx, sy) = convention.signs();
    [sx * dx, sy * dy, strength]
}

/// Map one unit-vector component from [-1, 1] to [0, 255].
#[inline]
pub fn encode_component(c: f32) -> u8 {
    ((c * 0.5 + 0.5) * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Encode a unit normal as (red, green, blue).
#[inline]
pub fn encode_normal(n: [f32; 3]) -> [u8; 3] {
    [encode_component(n[0]), encode_component(n[1]), encode_component(n[2])]
}

/// Decode an RGB pixel back to the vector it encodes (lossy).
#[inline]
pub fn decode_normal(rgb: [u8; 3]) -> [f32; 3] {
    rgb.map(|c| 2.0 * c as f32 / 255.0 - 1.0)
}

/// Write the normal map for `(dx, dy)` into a caller-owned buffer.
///
/// # Arguments
/// * `dx`, `dy` - Derivative fields (height, width)
/// * `strength` - Z component of every raw normal
/// * `convention` - Which derivative sign is flipped
/// * `dst` - Destination of shape (height, width, 3)
///
/// # Errors
/// Shapes and channel count are checked before any pixel is written.
pub fn synthesize_normals_into(
    dx: ArrayView2<f32>,
    dy: ArrayView2<f32>,
    strength: f32,
    convention: GradientConvention,
    mut dst: ArrayViewMut3<u8>,
) -> Result<()> {
    ensure_same_dim(dx.dim(), dy.dim())?;
    let (height, width, channels) = dst.dim();
    ensure_same_dim(dx.dim(), (height, width))?;
    if channels != 3 {
        return Err(NormalMapError::ChannelMismatch { expected: 3, found: channels });
    }
    validate_strength(strength)?;

    Zip::from(dst.lanes_mut(Axis(2)))
        .and(dx)
        .and(dy)
        .par_for_each(|mut pixel, &gx, &gy| {
            let normal = normalize_vec3(raw_normal(gx, gy, strength, convention));
            let [r, g, b] = encode_normal(normal);
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        });

    Ok(())
}

/// Allocate and fill a normal map for `(dx, dy)`.
pub fn synthesize_normals(
    dx: ArrayView2<f32>,
    dy: ArrayView2<f32>,
    strength: f32,
    convention: GradientConvention,
) -> Result<NormalMapImage> {
    let (height, width) = dx.dim();
    let mut output = Array3::<u8>::zeros((height, width, 3));
    synthesize_normals_into(dx, dy, strength, convention, output.view_mut())?;
    Ok(output)
}

/// [`synthesize_normals`] over a [`GradientPair`].
pub fn synthesize_from_gradients(
    gradients: &GradientPair,
    strength: f32,
    convention: GradientConvention,
) -> Result<NormalMapImage> {
    synthesize_normals(gradients.dx(), gradients.dy(), strength, convention)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn pixel(img: &NormalMapImage, y: usize, x: usize) -> [u8; 3] {
        [img[[y, x, 0]], img[[y, x, 1]], img[[y, x, 2]]]
    }

    #[test]
    fn test_normalize_unit_length() {
        let n = normalize_vec3([3.0, -4.0, 12.0]);
        assert_relative_eq!(n[0], 3.0 / 13.0, epsilon = 1e-6);
        assert_relative_eq!(n[1], -4.0 / 13.0, epsilon = 1e-6);
        assert_relative_eq!(n[2], 12.0 / 13.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_falls_back() {
        assert_eq!(normalize_vec3([0.0, 0.0, 0.0]), FLAT_NORMAL);
        assert_eq!(normalize_vec3([f32::NAN, 0.0, 1.0]), FLAT_NORMAL);
        assert_eq!(normalize_vec3([f32::INFINITY, 0.0, 1.0]), FLAT_NORMAL);
    }

    #[test]
    fn test_normalize_large_values() {
        let n = normalize_vec3([3.0e30, 0.0, 4.0e30]);
        assert_relative_eq!(n[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(n[2], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component(-1.0), 0);
        assert_eq!(encode_component(0.0), 128);
        assert_eq!(encode_component(-0.0), 128);
        assert_eq!(encode_component(1.0), 255);
        assert_eq!(encode_component(2.0), 255);
        assert_eq!(encode_component(-2.0), 0);
    }

    #[test]
    fn test_flat_gradients_encode_flat_normal() {
        let zeros = Array2::<f32>::zeros((4, 5));
        let img = synthesize_normals(zeros.view(), zeros.view(), 30.0, GradientConvention::NegateX).unwrap();
        assert_eq!(img.dim(), (4, 5, 3));
        for y in 0..4 {
            for x in 0..5 {
                assert_eq!(pixel(&img, y, x), [128, 128, 255]);
            }
        }
    }

    #[test]
    fn test_degenerate_zero_strength_is_flat() {
        let zeros = Array2::<f32>::zeros((2, 2));
        let img = synthesize_normals(zeros.view(), zeros.view(), 0.0, GradientConvention::NegateX).unwrap();
        assert_eq!(pixel(&img, 1, 1), [128, 128, 255]);
    }

    #[test]
    fn test_zero_strength_with_gradient() {
        let dx = Array2::<f32>::from_elem((1, 1), 5.0);
        let dy = Array2::<f32>::zeros((1, 1));
        let img = synthesize_normals(dx.view(), dy.view(), 0.0, GradientConvention::NegateX).unwrap();
        assert_eq!(pixel(&img, 0, 0), [0, 128, 128]);
    }

    #[test]
    fn test_conventions_flip_signs() {
        let dx = Array2::<f32>::from_elem((1, 1), 10.0);
        let dy = Array2::<f32>::from_elem((1, 1), 10.0);
        let a = synthesize_normals(dx.view(), dy.view(), 10.0, GradientConvention::NegateX).unwrap();
        let b = synthesize_normals(dx.view(), dy.view(), 10.0, GradientConvention::NegateY).unwrap();
        let (pa, pb) = (pixel(&a, 0, 0), pixel(&b, 0, 0));
        assert!(pa[0] < 128 && pa[1] > 128);
        assert!(pb[0] > 128 && pb[1] < 128);
        assert_eq!(pa[2], pb[2]);
        assert_eq!(pa[0] as u16 + pb[0] as u16, 255);
    }

    #[test]
    fn test_decoded_norm_close_to_one() {
        let dx = Array2::from_shape_fn((8, 8), |(y, x)| (x as f32 - 4.0) * 7.0 + y as f32);
        let dy = Array2::from_shape_fn((8, 8), |(y, x)| (y as f32 - 3.0) * 11.0 - x as f32);
        let img = synthesize_normals(dx.view(), dy.view(), 20.0, GradientConvention::NegateX).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                let v = decode_normal(pixel(&img, y, x));
                let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
                assert!((norm - 1.0).abs() < 1e-2, "norm {} at ({}, {})", norm, y, x);
            }
        }
    }

    #[test]
    fn test_blue_upper_half_when_strength_dominates() {
        let dx = Array2::from_shape_fn((6, 6), |(y, x)| (x as f32 - y as f32) * 1.5);
        let dy = Array2::from_shape_fn((6, 6), |(y, x)| (x as f32 + y as f32) - 5.0);
        let img = synthesize_normals(dx.view(), dy.view(), 10.0, GradientConvention::NegateX).unwrap();
        assert!(img.index_axis(Axis(2), 2).iter().all(|&b| b >= 128));
    }

    #[test]
    fn test_idempotent() {
        let dx = Array2::from_shape_fn((5, 7), |(y, x)| (x * y) as f32 - 6.0);
        let dy = Array2::from_shape_fn((5, 7), |(y, x)| x as f32 - 2.0 * y as f32);
        let a = synthesize_normals(dx.view(), dy.view(), 3.0, GradientConvention::NegateX).unwrap();
        let b = synthesize_normals(dx.view(), dy.view(), 3.0, GradientConvention::NegateX).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_strength_sweep_is_monotonic() {
        let dx = Array2::from_shape_fn((4, 4), |(y, x)| (x as f32 - 1.5) * 40.0 + y as f32);
        let dy = Array2::from_shape_fn((4, 4), |(y, x)| (1.5 - y as f32) * 25.0 - x as f32);
        let mut previous: Option<NormalMapImage> = None;
        for strength in [1.0f32, 5.0, 20.0, 80.0, 320.0] {
            let img = synthesize_normals(dx.view(), dy.view(), strength, GradientConvention::NegateX).unwrap();
            if let Some(prev) = &previous {
                for y in 0..4 {
                    for x in 0..4 {
                        let (p, c) = (pixel(prev, y, x), pixel(&img, y, x));
                        assert!(c[2] >= p[2]);
                        for ch in 0..2 {
                            let dist_prev = (p[ch] as i32 - 128).abs();
                            let dist_cur = (c[ch] as i32 - 128).abs();
                            assert!(dist_cur <= dist_prev + 1);
                        }
                    }
                }
            }
            previous = Some(img);
        }
    }

    #[test]
    fn test_mismatched_gradients_rejected() {
        let dx = Array2::<f32>::zeros((4, 4));
        let dy = Array2::<f32>::zeros((4, 3));
        assert!(matches!(
            synthesize_normals(dx.view(), dy.view(), 1.0, GradientConvention::NegateX),
            Err(NormalMapError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_destination_checked_before_writing() {
        let zeros = Array2::<f32>::zeros((3, 3));

        let mut wrong_size = Array3::<u8>::from_elem((3, 4, 3), 7);
        let err = synthesize_normals_into(zeros.view(), zeros.view(), 1.0, GradientConvention::NegateX, wrong_size.view_mut());
        assert!(matches!(err, Err(NormalMapError::DimensionMismatch { .. })));
        assert!(wrong_size.iter().all(|&v| v == 7));

        let mut wrong_channels = Array3::<u8>::from_elem((3, 3, 4), 7);
        let err = synthesize_normals_into(zeros.view(), zeros.view(), 1.0, GradientConvention::NegateX, wrong_channels.view_mut());
        assert!(matches!(err, Err(NormalMapError::ChannelMismatch { expected: 3, found: 4 })));
        assert!(wrong_channels.iter().all(|&v| v == 7));
    }

    #[test]
    fn test_negative_strength_rejected() {
        let zeros = Array2::<f32>::zeros((2, 2));
        assert!(matches!(
            synthesize_normals(zeros.view(), zeros.view(), -1.0, GradientConvention::NegateX),
            Err(NormalMapError::InvalidParameter(_))
        ));
    }
}
