//! Writers for integrated diffractograms and buffer lists.
//!
//! This module provides functions for writing:
//! - Two-column (2θ, intensity) profiles from partial integrations
//! - Multi-sector "cake" files from full integrations, with their header
//! - WinPLOTR buffer files listing diffractograms one per line

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::integrator::{Cake, Profile};

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Angle and intensity columns differ in length.
    #[error("array length mismatch: {angles_len} angles, {values_len} intensities")]
    LengthMismatch { angles_len: usize, values_len: usize },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

fn write_failed(path: &Path) -> impl Fn(std::io::Error) -> WriteError + '_ {
    move |e| WriteError::WriteFile {
        path: path.display().to_string(),
        source: e,
    }
}

/// Write a profile as two columns: 2θ with 6 decimals, intensity with 4.
///
/// No header is written; provenance comments are prepended once the file
/// reaches its destination folder.
///
/// # Errors
///
/// Returns an error if the columns differ in length or the file cannot be
/// written.
///
/// # Example
///
/// ```no_run
/// use integxr::core::integrator::Profile;
/// use integxr::core::writers::write_profile;
/// use std::path::Path;
///
/// let profile = Profile::new(vec![10.0, 10.5], vec![120.0, 98.25]);
/// write_profile(Path::new("Sample_axis0_apert30_2.dat"), &profile).unwrap();
/// ```
pub fn write_profile(path: &Path, profile: &Profile) -> Result<()> {
    if profile.angles.len() != profile.intensities.len() {
        return Err(WriteError::LengthMismatch {
            angles_len: profile.angles.len(),
            values_len: profile.intensities.len(),
        });
    }

    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;
    let fail = write_failed(path);

    for (angle, intensity) in profile.angles.iter().zip(&profile.intensities) {
        writeln!(writer, "{:.6}  {:.4}", angle, intensity).map_err(&fail)?;
    }

    writer.flush().map_err(&fail)?;
    Ok(())
}

/// Write a full-integration result.
///
/// Layout:
/// - `### tth/chi <points>  2theta values / <sectors>  sectors  `
/// - `### tth/chi  ` followed by the sector angles (2 decimals)
/// - one row per 2θ point: the angle (6 decimals) then one count per sector
///   (4 decimals), separated by two spaces
pub fn write_cake(path: &Path, cake: &Cake) -> Result<()> {
    for sector in &cake.intensities {
        if sector.len() != cake.radial.len() {
            return Err(WriteError::LengthMismatch {
                angles_len: cake.radial.len(),
                values_len: sector.len(),
            });
        }
    }

    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;
    let fail = write_failed(path);

    writeln!(
        writer,
        "### tth/chi {}  2theta values / {}  sectors  ",
        cake.radial.len(),
        cake.azimuthal.len()
    )
    .map_err(&fail)?;

    let sectors: Vec<String> = cake.azimuthal.iter().map(|chi| format!("{:.2}", chi)).collect();
    writeln!(writer, "### tth/chi  {}", sectors.join("  ")).map_err(&fail)?;

    for (i, tth) in cake.radial.iter().enumerate() {
        let counts: Vec<String> = cake
            .intensities
            .iter()
            .map(|sector| format!("{:.4}", sector[i]))
            .collect();
        writeln!(writer, "{:.6}  {}", tth, counts.join("  ")).map_err(&fail)?;
    }

    writer.flush().map_err(&fail)?;
    Ok(())
}

/// Write a WinPLOTR buffer: one file name per line, each newline-terminated.
pub fn write_buffer_list(path: &Path, names: &[String]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;
    let fail = write_failed(path);

    for name in names {
        writeln!(writer, "{}", name).map_err(&fail)?;
    }

    writer.flush().map_err(&fail)?;
    Ok(())
}
