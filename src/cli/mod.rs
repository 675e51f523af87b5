//! Command-line interface for the diffractogram tools.

use clap::{ArgGroup, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::naming::FrameStride;
use crate::processors::buffer::BufferSelection;
use crate::processors::integration::PatternSource;
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "integxr")]
#[command(about = "Batch tools for integrated X-ray diffractograms", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the images an integration run would pick up
    Scan {
        /// Directory containing the detector images
        directory: PathBuf,
        /// Exclude the interleaved acceleration frames (odd indices)
        #[arg(long)]
        accel: bool,
        /// Image extension (defaults to the configured one)
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// Copy a folder's diffractograms in reverse order into <pattern>_REVERSE
    Reverse {
        /// Folder containing the diffractograms
        folder: PathBuf,
        /// Base pattern of the file names (derived from the first file if omitted)
        #[arg(short, long)]
        pattern: Option<String>,
    },

    /// Write a WinPLOTR buffer file listing diffractograms
    #[command(group(ArgGroup::new("selection").required(true).args(["partial", "complete"])))]
    Buffer {
        /// Diffractogram files, in buffer order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Keep about this many evenly spaced files
        #[arg(long)]
        partial: Option<usize>,
        /// Keep every file
        #[arg(long)]
        complete: bool,
    },

    /// Add a constant to the intensity column of every diffractogram in a folder
    Offset {
        /// Folder containing the diffractograms
        folder: PathBuf,
        /// Intensity offset
        #[arg(allow_negative_numbers = true)]
        offset: f64,
        /// Diffractogram extension (defaults to the configured output extension)
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// Renumber a folder's diffractograms as <pattern>_<index>
    Renumber {
        /// Folder containing the diffractograms
        folder: PathBuf,
        /// Base pattern of the file names (derived from the first file if omitted)
        #[arg(short, long)]
        pattern: Option<String>,
        /// Halve the indices of a run recorded with acceleration frames
        #[arg(long)]
        accel: bool,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn pattern_source(pattern: Option<String>) -> PatternSource {
    match pattern {
        Some(p) => PatternSource::Explicit(p),
        None => PatternSource::Delimited,
    }
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect()
}

fn fail(spinner: &ProgressBar, what: &str, e: impl std::fmt::Display) -> ! {
    spinner.finish_and_clear();
    error!("{} failed: {:#}", what, e);
    std::process::exit(1);
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Scan { directory, accel, extension } => {
            cmd_scan(&directory, accel, extension, &config);
        }
        Commands::Reverse { folder, pattern } => {
            cmd_reverse(&folder, pattern, &config);
        }
        Commands::Buffer { files, partial, complete } => {
            let selection = match (partial, complete) {
                (Some(target), _) => BufferSelection::Every(target),
                (None, _) => BufferSelection::All,
            };
            cmd_buffer(&files, selection, &config);
        }
        Commands::Offset { folder, offset, extension } => {
            cmd_offset(&folder, offset, extension, &config);
        }
        Commands::Renumber { folder, pattern, accel } => {
            cmd_renumber(&folder, pattern, accel, &config);
        }
    }
}

fn cmd_scan(directory: &Path, accel: bool, extension: Option<String>, config: &PipelineConfig) {
    use crate::processors::selection;

    let start = Instant::now();
    let extension = extension.unwrap_or_else(|| config.integration.image_extension.clone());
    let stride = FrameStride::from_acceleration(accel);

    let spinner = create_spinner("Scanning directory for detector images...");

    let result = selection::scan(directory, &extension, stride, &config.integration.output_extension);
    let selection = match result {
        Ok(s) => s,
        Err(e) => fail(&spinner, "Scan", e),
    };

    spinner.finish_and_clear();

    for (image, output) in selection.images.iter().zip(&selection.expected_outputs) {
        println!("{} -> {}", image.path.display(), output);
    }

    if selection.is_empty() {
        warn!("No '.{}' image found in {}", extension, directory.display());
    }

    print_summary(
        "Scan Complete",
        &[
            ("Directory", directory.display().to_string()),
            ("Extension", extension),
            ("Acceleration", accel.to_string()),
            ("Images selected", selection.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_reverse(folder: &Path, pattern: Option<String>, config: &PipelineConfig) {
    use crate::processors::reverse;

    let start = Instant::now();

    println!("Reversing diffractograms...");
    println!("Folder: {}", folder.display());

    let spinner = create_spinner("Writing reversed copies...");

    let report = match reverse::reverse_folder(folder, &pattern_source(pattern), &config.reverse.extension) {
        Ok(r) => r,
        Err(e) => fail(&spinner, "Reverse", e),
    };

    spinner.finish_and_clear();

    print_summary(
        "Reverse Complete",
        &[
            (
                "Destination",
                report
                    .destination
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
            ),
            ("Files reversed", report.outputs.len().to_string()),
            ("Files failed", report.failed.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_buffer(files: &[PathBuf], selection: BufferSelection, config: &PipelineConfig) {
    use crate::processors::buffer;

    let start = Instant::now();

    let spinner = create_spinner("Writing buffer file...");

    let path = match buffer::create_buffer(files, selection, &config.buffer.file_name) {
        Ok(p) => p,
        Err(e) => fail(&spinner, "Buffer creation", e),
    };

    spinner.finish_and_clear();

    let mode = match selection {
        BufferSelection::Every(target) => format!("partial ({})", target),
        BufferSelection::All => "complete".to_string(),
    };

    print_summary(
        "Buffer Created",
        &[
            ("Buffer file", path.display().to_string()),
            ("Input files", files.len().to_string()),
            ("Selection", mode),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_offset(folder: &Path, offset: f64, extension: Option<String>, config: &PipelineConfig) {
    use crate::processors::sequencing;

    let start = Instant::now();
    let extension = extension.unwrap_or_else(|| config.integration.output_extension.clone());

    println!("Applying intensity offset of {}...", offset);
    println!("Folder: {}", folder.display());

    let spinner = create_spinner("Correcting intensities...");

    let files = match sequencing::list_files(folder, &extension) {
        Ok(f) => f,
        Err(e) => fail(&spinner, "Offset", e),
    };
    let names = file_names(&files);

    let corrected = match sequencing::apply_offset_to_all(folder, &names, offset) {
        Ok(n) => n,
        Err(e) => fail(&spinner, "Offset", e),
    };

    spinner.finish_and_clear();

    print_summary(
        "Intensity Offset Complete",
        &[
            ("Folder", folder.display().to_string()),
            ("Offset", offset.to_string()),
            ("Files corrected", corrected.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_renumber(folder: &Path, pattern: Option<String>, accel: bool, config: &PipelineConfig) {
    use crate::processors::sequencing;

    let start = Instant::now();
    let stride = FrameStride::from_acceleration(accel);

    let spinner = create_spinner("Renumbering diffractograms...");

    let files = match sequencing::list_files(folder, &config.integration.output_extension) {
        Ok(f) => f,
        Err(e) => fail(&spinner, "Renumbering", e),
    };

    let Some(first) = files.first() else {
        fail(&spinner, "Renumbering", format!("no diffractogram found in {}", folder.display()));
    };

    let pattern = match pattern_source(pattern).resolve(first) {
        Ok(p) => p,
        Err(e) => fail(&spinner, "Renumbering", e),
    };

    let renamed = match sequencing::renumber(folder, &file_names(&files), &pattern, stride) {
        Ok(r) => r,
        Err(e) => fail(&spinner, "Renumbering", e),
    };

    spinner.finish_and_clear();

    print_summary(
        "Renumbering Complete",
        &[
            ("Folder", folder.display().to_string()),
            ("Pattern", pattern),
            ("Stride", stride.get().to_string()),
            ("Files renamed", renamed.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_buffer_requires_a_selection() {
        assert!(Cli::try_parse_from(["integxr", "buffer", "a.dat"]).is_err());
        assert!(Cli::try_parse_from(["integxr", "buffer", "a.dat", "--partial", "3", "--complete"]).is_err());
        assert!(Cli::try_parse_from(["integxr", "buffer", "a.dat", "b.dat", "--partial", "3"]).is_ok());
    }

    #[test]
    fn test_negative_offset_is_accepted() {
        let cli = Cli::try_parse_from(["integxr", "-v", "offset", "out", "-12.5"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Offset { offset, extension, .. } => {
                assert_eq!(offset, -12.5);
                assert_eq!(extension, None);
            }
            _ => panic!("Expected the offset subcommand"),
        }
    }

    #[test]
    fn test_offset_extension_override() {
        let cli = Cli::try_parse_from(["integxr", "offset", "out", "2", "--extension", "xy"]).unwrap();
        match cli.command {
            Commands::Offset { extension, .. } => assert_eq!(extension.as_deref(), Some("xy")),
            _ => panic!("Expected the offset subcommand"),
        }
    }
}
