//! Pipeline orchestration: grayscale -> blurred -> (dx, dy) -> normal map.
//!
//! [`compute_normal_map`] is the stateless entry point. [`NormalMapper`]
//! keeps the intermediate fields of the last pass so a host reacting to
//! parameter changes only redoes the stages those parameters feed:
//! blur parameters invalidate the blurred field, the gradients and the
//! normal map; strength and convention invalidate only the normal map.

use std::time::Instant;

use ndarray::ArrayView2;

use crate::error::Result;
use crate::field::{ensure_non_empty, GradientPair, IntensityField, NormalMapImage};
use crate::filters::blur::gaussian_blur;
use crate::filters::edge::sobel_gradients;
use crate::normals::{synthesize_normals, synthesize_normals_into};
use crate::params::Parameters;

/// Compute a normal map from a grayscale intensity field.
///
/// Pure function of its inputs: validates parameters, blurs, differentiates
/// and synthesizes into a freshly allocated image.
///
/// # Arguments
/// * `source` - Intensity field (height, width), 0.0-255.0
/// * `params` - Blur and strength parameters
///
/// # Returns
/// RGB normal map (height, width, 3)
pub fn compute_normal_map(source: ArrayView2<f32>, params: &Parameters) -> Result<NormalMapImage> {
    ensure_non_empty(source)?;
    params.validate()?;

    let stages = Stages::compute(source, params)?;
    synthesize_normals(stages.gradients.dx(), stages.gradients.dy(), params.strength, params.convention)
}

/// Which stages the last [`NormalMapper::update`] ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Blur, gradients and synthesis.
    Full,
    /// Synthesis only, reusing cached gradients.
    SynthesisOnly,
}

#[derive(Debug, Clone)]
struct Stages {
    blurred: IntensityField,
    gradients: GradientPair,
}

impl Stages {
    fn compute(source: ArrayView2<f32>, params: &Parameters) -> Result<Self> {
        let blurred = gaussian_blur(source, params.blur_kernel_size, params.blur_sigma)?;
        let gradients = sobel_gradients(blurred.view())?;
        Ok(Self { blurred, gradients })
    }
}

/// Cached pipeline over one source image.
#[derive(Debug, Clone)]
pub struct NormalMapper {
    source: IntensityField,
    parameters: Option<Parameters>,
    stages: Option<Stages>,
    normal_map: Option<NormalMapImage>,
    last_pass: Option<PassKind>,
}

impl NormalMapper {
    /// Wrap a source field. Empty fields are rejected.
    pub fn new(source: IntensityField) -> Result<Self> {
        ensure_non_empty(source.view())?;
        Ok(Self {
            source,
            parameters: None,
            stages: None,
            normal_map: None,
            last_pass: None,
        })
    }

    /// Replace the source image, dropping every cached field.
    pub fn set_source(&mut self, source: IntensityField) -> Result<()> {
        ensure_non_empty(source.view())?;
        self.source = source;
        self.parameters = None;
        self.stages = None;
        self.normal_map = None;
        self.last_pass = None;
        Ok(())
    }

    /// Recompute for new parameters, rerunning only invalidated stages.
    ///
    /// On a parameter error nothing cached is touched.
    pub fn update(&mut self, params: &Parameters) -> Result<&NormalMapImage> {
        params.validate()?;
        let started = Instant::now();

        let reuse = match (&self.parameters, &self.stages) {
            (Some(previous), Some(_)) => !previous.blur_changed(params),
            _ => false,
        };

        let stages = match self.stages.take() {
            Some(stages) if reuse => stages,
            _ => Stages::compute(self.source.view(), params)?,
        };
        let stages = self.stages.insert(stages);
        let (dx, dy) = (stages.gradients.dx(), stages.gradients.dy());

        let normal_map = match self.normal_map.take() {
            Some(mut map) => {
                synthesize_normals_into(dx, dy, params.strength, params.convention, map.view_mut())?;
                map
            }
            None => synthesize_normals(dx, dy, params.strength, params.convention)?,
        };

        let pass = if reuse { PassKind::SynthesisOnly } else { PassKind::Full };
        let (height, width) = self.source.dim();
        log::debug!(
            "normal map pass {:?}: {}x{} strength={} blur={}/{:.3} in {:?}",
            pass,
            width,
            height,
            params.strength,
            params.effective_kernel_size(),
            params.effective_sigma(),
            started.elapsed()
        );

        self.parameters = Some(*params);
        self.last_pass = Some(pass);
        Ok(&*self.normal_map.insert(normal_map))
    }

    pub fn source(&self) -> &IntensityField {
        &self.source
    }

    /// Parameters of the last successful pass.
    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    pub fn blurred(&self) -> Option<&IntensityField> {
        self.stages.as_ref().map(|s| &s.blurred)
    }

    pub fn gradients(&self) -> Option<&GradientPair> {
        self.stages.as_ref().map(|s| &s.gradients)
    }

    pub fn normal_map(&self) -> Option<&NormalMapImage> {
        self.normal_map.as_ref()
    }

    pub fn last_pass(&self) -> Option<PassKind> {
        self.last_pass
    }
}
