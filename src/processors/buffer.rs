//! WinPLOTR buffer files.
//!
//! A buffer lists the diffractograms WinPLOTR should load, one file name per
//! line. Long sequences are usually thinned out to a target size by keeping
//! every n-th file.

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::core::writers::{write_buffer_list, WriteError};

/// Errors that can occur while creating a buffer.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("no diffractogram selected for the buffer")]
    NoFiles,

    #[error("buffer size must be at least 1")]
    ZeroSize,

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Result type for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;

/// Which diffractograms go into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSelection {
    /// About this many files, evenly spaced from the first one.
    Every(usize),
    /// Every file.
    All,
}

/// Spacing that brings `total` files down to at most `target`.
#[inline]
pub fn buffer_step(total: usize, target: usize) -> usize {
    total.div_ceil(target).max(1)
}

/// Pick the buffer entries from `names`, keeping their order.
pub fn select_entries(names: &[String], selection: BufferSelection) -> Result<Vec<String>> {
    if names.is_empty() {
        return Err(BufferError::NoFiles);
    }

    match selection {
        BufferSelection::All => Ok(names.to_vec()),
        BufferSelection::Every(0) => Err(BufferError::ZeroSize),
        BufferSelection::Every(target) => {
            let step = buffer_step(names.len(), target);
            info!("Buffer file with 1 diffractogram on {}", step);
            Ok(names.iter().step_by(step).cloned().collect())
        }
    }
}

/// Write `<file_name>.buf` next to the first of `files`.
///
/// Entries are the base names of the selected files.
///
/// # Returns
///
/// Path of the buffer file.
pub fn create_buffer(files: &[PathBuf], selection: BufferSelection, file_name: &str) -> Result<PathBuf> {
    let first = files.first().ok_or(BufferError::NoFiles)?;
    let directory = first.parent().unwrap_or_else(|| Path::new(""));

    let names: Vec<String> = files
        .iter()
        .map(|f| {
            f.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        })
        .collect();

    let entries = select_entries(&names, selection)?;
    let path = directory.join(format!("{}.buf", file_name));
    write_buffer_list(&path, &entries)?;

    info!("Buffer file for WinPLOTR created: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S_{}.dat", i)).collect()
    }

    #[test]
    fn test_buffer_step() {
        assert_eq!(buffer_step(10, 3), 4);
        assert_eq!(buffer_step(9, 3), 3);
        assert_eq!(buffer_step(2, 5), 1);
    }

    #[test]
    fn test_select_every() {
        let selected = select_entries(&names(10), BufferSelection::Every(3)).unwrap();
        assert_eq!(selected, vec!["S_0.dat", "S_4.dat", "S_8.dat"]);
    }

    #[test]
    fn test_select_every_exact_multiple_stays_in_bounds() {
        let selected = select_entries(&names(9), BufferSelection::Every(3)).unwrap();
        assert_eq!(selected, vec!["S_0.dat", "S_3.dat", "S_6.dat"]);
    }

    #[test]
    fn test_select_all_and_errors() {
        assert_eq!(select_entries(&names(4), BufferSelection::All).unwrap(), names(4));
        assert!(matches!(select_entries(&[], BufferSelection::All), Err(BufferError::NoFiles)));
        assert!(matches!(
            select_entries(&names(4), BufferSelection::Every(0)),
            Err(BufferError::ZeroSize)
        ));
    }

    #[test]
    fn test_create_buffer_in_first_file_directory() {
        let temp_dir = TempDir::new().unwrap();
        let files: Vec<PathBuf> = names(10).iter().map(|n| temp_dir.path().join(n)).collect();

        let path = create_buffer(&files, BufferSelection::Every(3), "buffer").unwrap();

        assert_eq!(path, temp_dir.path().join("buffer.buf"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "S_0.dat\nS_4.dat\nS_8.dat\n");
    }
}
