//! Pipeline parameters and their JSON configuration form.
//!
//! A host may replace the parameters at any time. Blur parameters feed the
//! smoothing stage (and therefore everything after it); `strength` and
//! `convention` only feed normal synthesis.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NormalMapError, Result};
use crate::filters::core::sigma_for_kernel_size;

/// Which gradient sign is flipped when building the raw normal.
///
/// Image rows grow downward, so the two variants disagree on whether the
/// encoded green channel points up or down:
///
/// - [`NegateX`](GradientConvention::NegateX): `(-dx, dy, strength)`.
///   Brighter-to-the-right lowers red, brighter-downward raises green.
/// - [`NegateY`](GradientConvention::NegateY): `(dx, -dy, strength)`.
///   Brighter-to-the-right raises red, brighter-downward lowers green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientConvention {
    #[default]
    NegateX,
    NegateY,
}

impl GradientConvention {
    /// Signs applied to `(dx, dy)`.
    #[inline]
    pub fn signs(self) -> (f32, f32) {
        match self {
            GradientConvention::NegateX => (-1.0, 1.0),
            GradientConvention::NegateY => (1.0, -1.0),
        }
    }
}

impl FromStr for GradientConvention {
    type Err = NormalMapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "negate_x" | "x" => Ok(GradientConvention::NegateX),
            "negate_y" | "y" => Ok(GradientConvention::NegateY),
            other => Err(NormalMapError::InvalidParameter(format!(
                "unknown gradient convention '{}' (expected negate_x or negate_y)",
                other
            ))),
        }
    }
}

impl fmt::Display for GradientConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradientConvention::NegateX => f.write_str("negate_x"),
            GradientConvention::NegateY => f.write_str("negate_y"),
        }
    }
}

/// Reject blur settings the smoothing stage cannot turn into a kernel.
pub(crate) fn validate_blur(kernel_size: usize, sigma: f32) -> Result<()> {
    if kernel_size == 0 {
        return Err(NormalMapError::InvalidParameter(
            "blur kernel size must be a positive odd integer, got 0".to_string(),
        ));
    }
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(NormalMapError::InvalidParameter(format!(
            "blur sigma must be finite and non-negative, got {}",
            sigma
        )));
    }
    Ok(())
}

pub(crate) fn validate_strength(strength: f32) -> Result<()> {
    if !strength.is_finite() || strength < 0.0 {
        return Err(NormalMapError::InvalidParameter(format!(
            "strength must be finite and non-negative, got {}",
            strength
        )));
    }
    Ok(())
}

/// Parameters of one recomputation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Z component of the raw normal. Larger values flatten the surface.
    pub strength: f32,
    /// Gaussian window extent in pixels. Even values are bumped to the next odd.
    pub blur_kernel_size: usize,
    /// Gaussian standard deviation; 0 derives it from the kernel size.
    pub blur_sigma: f32,
    pub convention: GradientConvention,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            strength: 30.0,
            blur_kernel_size: 7,
            blur_sigma: 0.0,
            convention: GradientConvention::default(),
        }
    }
}

impl Parameters {
    pub fn new(strength: f32, blur_kernel_size: usize, blur_sigma: f32) -> Self {
        Self {
            strength,
            blur_kernel_size,
            blur_sigma,
            convention: GradientConvention::default(),
        }
    }

    pub fn with_convention(mut self, convention: GradientConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Check every field. Even kernel sizes are not an error (see
    /// [`effective_kernel_size`](Self::effective_kernel_size)).
    pub fn validate(&self) -> Result<()> {
        validate_blur(self.blur_kernel_size, self.blur_sigma)?;
        validate_strength(self.strength)
    }

    /// Kernel size actually used by the smoothing stage (always odd).
    pub fn effective_kernel_size(&self) -> usize {
        self.blur_kernel_size | 1
    }

    /// Sigma actually used by the smoothing stage.
    pub fn effective_sigma(&self) -> f32 {
        if self.blur_sigma > 0.0 {
            self.blur_sigma
        } else {
            sigma_for_kernel_size(self.effective_kernel_size())
        }
    }

    /// Whether switching from `self` to `other` requires re-blurring.
    pub fn blur_changed(&self, other: &Parameters) -> bool {
        self.effective_kernel_size() != other.effective_kernel_size()
            || self.effective_sigma() != other.effective_sigma()
    }

    /// Parse a (possibly partial) JSON document; missing fields keep defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Parameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
