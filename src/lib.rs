//! Batch integration of 2D X-ray detector images into 1D diffractograms.
//!
//! This crate provides tools for:
//! - Selecting the images of a run, optionally skipping acceleration frames
//! - Driving an azimuthal integrator over full-circle or orthogonal partial windows
//! - Gathering, correcting, annotating and renumbering the resulting diffractograms
//! - Reversing a sequence and writing WinPLOTR buffer files
//!
//! Image decoding and the integration itself are supplied by the caller
//! through [`ImageDecoder`] and [`Integrator`].
//!
//! # Example
//!
//! ```no_run
//! use integxr::core::{Calibration, ImageDecoder, Integrator};
//! use integxr::processors::integration::{self, IntegrationMode, IntegrationRequest, PatternSource};
//! use integxr::{FrameStride, PipelineConfig};
//!
//! fn integrate(decoder: &dyn ImageDecoder, integrator: &dyn Integrator) -> anyhow::Result<()> {
//!     let request = IntegrationRequest {
//!         image_dir: "run_042".into(),
//!         calibration: Calibration::load("run_042/detector.poni")?,
//!         dark: None,
//!         stride: FrameStride::SKIP_ACCELERATION,
//!         mode: IntegrationMode::Partial { aperture: 30 },
//!         pattern: PatternSource::Delimited,
//!     };
//!     let report = integration::run(&request, &PipelineConfig::default(), decoder, integrator)?;
//!     println!("{} diffractograms written", report.outputs.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use crate::config::{BufferConfig, IntegrationConfig, PipelineConfig, ReverseConfig, SequencingConfig};
pub use crate::core::integrator::{ImageDecoder, Integrator};
pub use crate::core::naming::{FilenamePattern, FrameStride};
pub use crate::processors::report::BatchReport;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
