//! Filter stages feeding normal synthesis.
//!
//! ## Field Format
//!
//! Every stage consumes and produces single-channel `f32` fields of shape
//! (height, width). Source intensities keep their 8-bit scale (0.0-255.0);
//! derivative fields are signed and unbounded.
//!
//! ## Architecture
//!
//! - **Owned outputs** - Each stage allocates a fresh field; inputs are never mutated
//! - **Replicated borders** - Out-of-range samples repeat the nearest edge sample
//! - **Thread-safe** - Row passes run in parallel via rayon
//!
//! ## Modules
//!
//! - **core**: kernels and separable correlation
//! - **blur**: Gaussian smoothing stage
//! - **edge**: Sobel gradient stage
//! - **grayscale**: RGB(A) to intensity conversion for hosts
//! - **visualize**: min-max preview of intermediate fields

pub mod core;
pub mod blur;
pub mod edge;
pub mod grayscale;
pub mod visualize;
