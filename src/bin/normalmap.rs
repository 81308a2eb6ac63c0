//! normalmap - compute a normal map from a single image.
//!
//! Usage: normalmap <image> [-o normals.png] [--strength 30] [--blur-size 7] [--blur-sigma 0]
//!
//! Parameters come from defaults, then an optional JSON file (`--params`),
//! then individual flags. Set `RUST_LOG=debug` for per-stage timings.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use image::{GrayImage, RgbImage};
use ndarray::{Array2, Array3};
use rayon::prelude::*;

use normalmap::filters::grayscale::luminance_u8;
use normalmap::filters::visualize::stretch_to_u8;
use normalmap::normals::synthesize_from_gradients;
use normalmap::{GradientConvention, IntensityField, NormalMapError, NormalMapImage, NormalMapper, Parameters};

#[derive(Parser, Debug)]
#[command(name = "normalmap")]
#[command(author, version, about = "Estimate a tangent-space normal map from a grayscale height image", long_about = None)]
struct Args {
    /// Input image (PNG or JPEG); color images are converted to luma
    input: PathBuf,

    /// Output normal map (PNG)
    #[arg(short, long, default_value = "normals.png")]
    output: PathBuf,

    /// JSON parameter file; flags below override its values
    #[arg(long)]
    params: Option<PathBuf>,

    /// Z component of the raw normal (larger = flatter)
    #[arg(long)]
    strength: Option<f32>,

    /// Gaussian blur kernel size (even values use the next odd size)
    #[arg(long)]
    blur_size: Option<usize>,

    /// Gaussian blur sigma (0 derives it from the kernel size)
    #[arg(long)]
    blur_sigma: Option<f32>,

    /// Gradient sign convention: negate_x or negate_y
    #[arg(long, value_parser = parse_convention)]
    convention: Option<GradientConvention>,

    /// Directory to write blurred and gradient previews into
    #[arg(long)]
    dump_intermediates: Option<PathBuf>,

    /// Additional strengths to render next to the output, reusing the gradients.
    /// Each is rendered in parallel and written as `<stem>_s<strength>.png`
    #[arg(long, value_delimiter = ',')]
    strength_sweep: Vec<f32>,
}

fn parse_convention(s: &str) -> Result<GradientConvention, String> {
    s.parse().map_err(|e: NormalMapError| e.to_string())
}

fn resolve_parameters(args: &Args) -> Result<Parameters, NormalMapError> {
    let mut params = match &args.params {
        Some(path) => Parameters::from_path(path)?,
        None => Parameters::default(),
    };
    if let Some(strength) = args.strength {
        params.strength = strength;
    }
    if let Some(size) = args.blur_size {
        params.blur_kernel_size = size;
    }
    if let Some(sigma) = args.blur_sigma {
        params.blur_sigma = sigma;
    }
    if let Some(convention) = args.convention {
        params.convention = convention;
    }
    params.validate()?;
    Ok(params)
}

fn load_grayscale(path: &Path) -> Result<IntensityField, NormalMapError> {
    let img = image::open(path)
        .map_err(|e| NormalMapError::InvalidInput(format!("cannot read {}: {}", path.display(), e)))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(NormalMapError::InvalidInput(format!("{} has no pixels", path.display())));
    }
    let pixels = Array3::from_shape_vec((height as usize, width as usize, 3), img.into_raw())?;
    luminance_u8(pixels.view())
}

fn image_error(path: &Path, err: image::ImageError) -> NormalMapError {
    NormalMapError::InvalidInput(format!("cannot write {}: {}", path.display(), err))
}

fn save_normal_map(map: &NormalMapImage, path: &Path) -> Result<(), NormalMapError> {
    let (height, width, _) = map.dim();
    let raw: Vec<u8> = map.iter().copied().collect();
    let img = RgbImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| NormalMapError::InvalidInput("normal map buffer size mismatch".to_string()))?;
    img.save(path).map_err(|e| image_error(path, e))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn save_preview(field: &Array2<f32>, path: &Path) -> Result<(), NormalMapError> {
    let preview = stretch_to_u8(field.view());
    let (height, width) = preview.dim();
    let raw: Vec<u8> = preview.iter().copied().collect();
    let img = GrayImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| NormalMapError::InvalidInput("preview buffer size mismatch".to_string()))?;
    img.save(path).map_err(|e| image_error(path, e))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn dump_intermediates(mapper: &NormalMapper, dir: &Path) -> Result<(), NormalMapError> {
    std::fs::create_dir_all(dir)?;
    if let Some(blurred) = mapper.blurred() {
        save_preview(blurred, &dir.join("blurred.png"))?;
    }
    if let Some(gradients) = mapper.gradients() {
        save_preview(&gradients.dx().to_owned(), &dir.join("dx.png"))?;
        save_preview(&gradients.dy().to_owned(), &dir.join("dy.png"))?;
    }
    Ok(())
}

fn sweep_path(output: &Path, strength: f32) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "normals".to_string());
    output.with_file_name(format!("{}_s{}.png", stem, strength))
}

fn run(args: &Args) -> Result<(), NormalMapError> {
    let params = resolve_parameters(args)?;
    log::info!(
        "strength={} blur_size={} blur_sigma={:.3} convention={}",
        params.strength,
        params.effective_kernel_size(),
        params.effective_sigma(),
        params.convention
    );

    let source = load_grayscale(&args.input)?;
    let (height, width) = source.dim();
    log::info!("loaded {} ({}x{})", args.input.display(), width, height);

    let mut mapper = NormalMapper::new(source)?;
    let map = mapper.update(&params)?;
    save_normal_map(map, &args.output)?;

    if let Some(dir) = &args.dump_intermediates {
        dump_intermediates(&mapper, dir)?;
    }

    if !args.strength_sweep.is_empty() {
        let gradients = mapper
            .gradients()
            .ok_or_else(|| NormalMapError::InvalidInput("no gradients to sweep".to_string()))?;
        let maps: Vec<(f32, NormalMapImage)> = args
            .strength_sweep
            .par_iter()
            .map(|&strength| {
                synthesize_from_gradients(gradients, strength, params.convention).map(|map| (strength, map))
            })
            .collect::<Result<_, _>>()?;
        for (strength, map) in &maps {
            save_normal_map(map, &sweep_path(&args.output, *strength))?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
