//! Batch integration of detector images.
//!
//! Images are processed one after another in selection order. A failure on
//! one image (decoding, integration, writing) is logged with the file name,
//! recorded in the [`BatchReport`] and the batch moves on to the next image.
//! Only an empty selection, an unusable pattern or a sequencing error aborts
//! the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use thiserror::Error;

use super::report::BatchReport;
use super::selection::{self, ImageFile, Selection};
use super::sequencing;
use crate::config::PipelineConfig;
use crate::core::integrator::{Calibration, ImageData, ImageDecoder, IntegrationError, Integrator, Profile};
use crate::core::naming::{self, FilenamePattern, FrameStride, PatternParseError};
use crate::core::windows::{self, AxisWindowSet};
use crate::core::writers;

/// Errors that abort an integration run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no '.{extension}' images selected in {}", .directory.display())]
    EmptySelection { directory: PathBuf, extension: String },

    #[error("cannot derive the file pattern: {0}")]
    Pattern(#[from] PatternParseError),
}

/// Full circle, or two orthogonal partial bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMode {
    /// 360° integration into `sectors` azimuthal sectors.
    Full,
    /// Bands of `aperture` degrees around the 0° and 90° axes.
    Partial { aperture: u32 },
}

/// Where the base pattern of the outputs comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    /// Derived from the first image, whose name carries a `_`/`-` delimited index.
    Delimited,
    /// Given by the user.
    Explicit(String),
}

impl PatternSource {
    /// Resolve the pattern against the first file of a batch.
    pub fn resolve(&self, first: &Path) -> Result<String, PipelineError> {
        match self {
            PatternSource::Explicit(pattern) => Ok(pattern.clone()),
            PatternSource::Delimited => Ok(FilenamePattern::from_path(first)?.base_pattern),
        }
    }
}

/// Everything a run needs besides the backends.
#[derive(Debug, Clone)]
pub struct IntegrationRequest {
    /// Folder holding the raw images; outputs are gathered below it.
    pub image_dir: PathBuf,
    pub calibration: Calibration,
    /// Optional dark frame subtracted by the integrator.
    pub dark: Option<PathBuf>,
    pub stride: FrameStride,
    pub mode: IntegrationMode,
    pub pattern: PatternSource,
}

/// State shared by the per-image steps of one run.
struct RunContext<'a> {
    image_dir: &'a Path,
    calibration: &'a Calibration,
    dark: Option<&'a ImageData>,
    pattern: &'a str,
    pattern_source: &'a PatternSource,
    config: &'a PipelineConfig,
}

impl RunContext<'_> {
    fn output_extension(&self) -> &str {
        &self.config.integration.output_extension
    }
}

/// Integrate one axis: call the integrator once per window and sum the
/// intensities onto the grid of the first window.
pub fn integrate_axis(
    integrator: &dyn Integrator,
    calibration: &Calibration,
    image: &ImageData,
    dark: Option<&ImageData>,
    points: usize,
    windows: &AxisWindowSet,
) -> Result<Profile, IntegrationError> {
    let mut profile = Profile::default();
    for window in &windows.windows {
        let partial = integrator.integrate_1d(calibration, image, dark, points, *window)?;
        profile.accumulate(partial)?;
    }
    Ok(profile)
}

/// Index token used in partial-integration names.
fn azimuth_index(image: &ImageFile, ctx: &RunContext<'_>) -> Result<String> {
    match ctx.pattern_source {
        PatternSource::Delimited => {
            let parsed = FilenamePattern::parse(&image.stem)?;
            Ok(parsed.sequence_index.to_string())
        }
        PatternSource::Explicit(pattern) => {
            let remainder = image.stem.strip_prefix(pattern.as_str()).unwrap_or(&image.stem);
            Ok(remainder.trim_start_matches(['_', '-']).to_string())
        }
    }
}

fn integrate_full_image(
    image: &ImageFile,
    decoder: &dyn ImageDecoder,
    integrator: &dyn Integrator,
    ctx: &RunContext<'_>,
) -> Result<String> {
    let data = decoder.decode(&image.path)?;
    let cake = integrator.integrate_2d(
        ctx.calibration,
        &data,
        ctx.dark,
        ctx.config.integration.points,
        ctx.config.integration.sectors,
    )?;

    let name = image.output_name(ctx.output_extension());
    writers::write_cake(&ctx.image_dir.join(&name), &cake)?;
    Ok(name)
}

fn integrate_partial_image(
    image: &ImageFile,
    decoder: &dyn ImageDecoder,
    integrator: &dyn Integrator,
    axes: &[AxisWindowSet; 2],
    aperture: u32,
    ctx: &RunContext<'_>,
) -> Result<Vec<String>> {
    let index = azimuth_index(image, ctx)?;
    let data = decoder.decode(&image.path)?;
    let points = ctx.config.integration.points;

    let mut profiles = Vec::with_capacity(axes.len());
    for set in axes {
        let profile = integrate_axis(integrator, ctx.calibration, &data, ctx.dark, points, set)?;
        profiles.push((set.axis, profile));
    }

    let mut names = Vec::with_capacity(profiles.len());
    for (axis, profile) in profiles {
        let name = format!(
            "{}.{}",
            naming::build_azimuth_filename(ctx.pattern, axis.degrees(), aperture, &index),
            ctx.output_extension()
        );
        writers::write_profile(&ctx.image_dir.join(&name), &profile)?;
        info!("File saved: {}", name);
        names.push(name);
    }

    Ok(names)
}

/// Move the written files into `folder`, wait for them, and apply the
/// configured intensity offset.
fn gather_outputs(ctx: &RunContext<'_>, folder: &Path, written: &[String]) -> Result<Vec<PathBuf>> {
    sequencing::ensure_folder(folder)?;
    let moved = sequencing::move_results(ctx.image_dir, folder, written)?;
    sequencing::wait_until_visible(&moved, &ctx.config.sequencing)?;

    let offset = ctx.config.sequencing.intensity_offset;
    if offset != 0.0 {
        info!(">> Intensity correction of {}", offset);
        sequencing::apply_offset_to_all(folder, written, offset)?;
    }

    Ok(moved)
}

/// Full mode: one multi-sector file per image, gathered in
/// `<pattern>_INTEG_FULL` and renumbered.
pub fn integrate_full(
    selection: &Selection,
    decoder: &dyn ImageDecoder,
    integrator: &dyn Integrator,
    request: &IntegrationRequest,
    config: &PipelineConfig,
    dark: Option<&ImageData>,
    pattern: &str,
) -> Result<BatchReport> {
    let ctx = RunContext {
        image_dir: &request.image_dir,
        calibration: &request.calibration,
        dark,
        pattern,
        pattern_source: &request.pattern,
        config,
    };

    info!(">> Total integration of 2D diffractograms");

    let mut report = BatchReport::default();
    let mut written = Vec::with_capacity(selection.len());

    for image in &selection.images {
        info!("Processing: {}", image.path.display());
        match integrate_full_image(image, decoder, integrator, &ctx) {
            Ok(name) => {
                report.record_success(&image.path);
                written.push(name);
            }
            Err(e) => report.record_failure(&image.path, format!("{:#}", e)),
        }
    }

    let folder = ctx.image_dir.join(naming::full_folder_name(pattern));
    let renames = sequencing::plan_renames(&written, pattern, request.stride)
        .with_context(|| format!("cannot renumber the outputs as '{}'", pattern))?;

    info!(">> Cleaning working directory");
    gather_outputs(&ctx, &folder, &written)?;

    for name in &written {
        let path = folder.join(name);
        if path.is_file() {
            sequencing::prepend_lines(&path, &[format!("### Original file: {}", name)])?;
        }
    }

    report.outputs = sequencing::apply_renames(&folder, &renames)
        .with_context(|| format!("failed to renumber outputs in {}", folder.display()))?;
    report.destination = Some(folder);

    Ok(report)
}

/// Partial mode: two two-column files per image (axis 0 and axis 90),
/// gathered in `<pattern>_INTEG_AZIM_<aperture>`.
#[allow(clippy::too_many_arguments)]
pub fn integrate_partial(
    selection: &Selection,
    decoder: &dyn ImageDecoder,
    integrator: &dyn Integrator,
    request: &IntegrationRequest,
    config: &PipelineConfig,
    dark: Option<&ImageData>,
    pattern: &str,
    aperture: u32,
) -> Result<BatchReport> {
    let ctx = RunContext {
        image_dir: &request.image_dir,
        calibration: &request.calibration,
        dark,
        pattern,
        pattern_source: &request.pattern,
        config,
    };

    let clamped = windows::clamp_aperture(aperture);
    if clamped != aperture {
        warn!("Aperture {}° exceeds {}°, using {}°", aperture, windows::MAX_APERTURE_DEG, clamped);
    }
    let (axis0, axis90) = windows::build_windows(clamped);
    let axes = [axis0, axis90];

    info!(">> Partial integration");

    let mut report = BatchReport::default();
    let mut written = Vec::with_capacity(selection.len() * 2);

    for image in &selection.images {
        info!("> Processing: {}", image.path.display());
        match integrate_partial_image(image, decoder, integrator, &axes, clamped, &ctx) {
            Ok(names) => {
                report.record_success(&image.path);
                written.extend(names);
            }
            Err(e) => report.record_failure(&image.path, format!("{:#}", e)),
        }
    }

    let folder = ctx.image_dir.join(naming::azimuth_folder_name(pattern, clamped));
    info!(">> Cleaning working directory");
    let moved = gather_outputs(&ctx, &folder, &written)?;

    let points = config.integration.points;
    for path in &moved {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        sequencing::prepend_lines(
            path,
            &[
                format!("### Original file: {}", name),
                "### Azimuthal integration parameters:".to_string(),
                format!("### Angle: {} deg - Npt: {}", clamped, points),
            ],
        )?;
    }

    report.outputs = moved;
    report.destination = Some(folder);

    Ok(report)
}

/// Run a complete integration batch.
///
/// Scans `request.image_dir`, resolves the pattern, decodes the dark frame
/// once, integrates every image and gathers the outputs in their
/// destination folder.
///
/// # Errors
///
/// Fails before creating any folder when no image is selected, when the
/// pattern cannot be derived or when the dark frame cannot be decoded.
/// Per-image failures are reported in the returned [`BatchReport`].
pub fn run(
    request: &IntegrationRequest,
    config: &PipelineConfig,
    decoder: &dyn ImageDecoder,
    integrator: &dyn Integrator,
) -> Result<BatchReport> {
    let selection = selection::scan(
        &request.image_dir,
        &config.integration.image_extension,
        request.stride,
        &config.integration.output_extension,
    )?;

    if request.stride.is_decimating() {
        info!(">> Acceleration frames excluded (stride {})", request.stride.get());
    }

    let first = selection.images.first().ok_or_else(|| PipelineError::EmptySelection {
        directory: request.image_dir.clone(),
        extension: config.integration.image_extension.clone(),
    })?;
    let pattern = request.pattern.resolve(&first.path)?;

    info!("Integration of {} diffraction images", selection.len());

    let dark = request
        .dark
        .as_deref()
        .map(|path| decoder.decode(path))
        .transpose()
        .context("failed to decode the dark frame")?;

    match request.mode {
        IntegrationMode::Full => integrate_full(
            &selection,
            decoder,
            integrator,
            request,
            config,
            dark.as_ref(),
            &pattern,
        ),
        IntegrationMode::Partial { aperture } => integrate_partial(
            &selection,
            decoder,
            integrator,
            request,
            config,
            dark.as_ref(),
            &pattern,
            aperture,
        ),
    }
}
