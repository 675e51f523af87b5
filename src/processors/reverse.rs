//! Reversal of diffractogram sequences recorded during cyclic scans.
//!
//! The files of a folder are sorted by trailing index, their order is
//! reversed, and annotated copies numbered 1..N are written to
//! `<pattern>_REVERSE`. Copies are named after that folder, so the fifth
//! reversed file of `Sample` is `Sample_REVERSE/Sample_REVERSE_5.dat`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use thiserror::Error;

use super::integration::PatternSource;
use super::report::BatchReport;
use super::sequencing;
use crate::core::naming::{self, PatternParseError};

/// Errors that abort the reverse workflow.
#[derive(Debug, Error)]
pub enum ReverseError {
    #[error("no '.{extension}' diffractograms found in {}", .folder.display())]
    NoFiles { folder: PathBuf, extension: String },
}

/// One file of the reversed sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversedEntry {
    /// Original diffractogram.
    pub source: PathBuf,
    /// Position in the reversed sequence, starting at 1.
    pub index: usize,
}

/// Sort `files` by their index after `pattern`, reverse the order and
/// assign positions 1..N.
///
/// With N files, position `i` holds the file ranked `N + 1 - i` in
/// ascending index order.
pub fn build_reversed_sequence(files: &[PathBuf], pattern: &str) -> Result<Vec<ReversedEntry>, PatternParseError> {
    let mut keyed = Vec::with_capacity(files.len());
    for file in files {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        keyed.push((naming::index_after_pattern(&stem, pattern)?, file));
    }

    keyed.sort_by_key(|(index, _)| *index);

    Ok(keyed
        .into_iter()
        .rev()
        .enumerate()
        .map(|(i, (_, file))| ReversedEntry {
            source: file.clone(),
            index: i + 1,
        })
        .collect())
}

/// Name of the `index`-th reversed copy.
pub fn reversed_filename(folder_name: &str, index: usize, extension: &str) -> String {
    format!("{}_{}.{}", folder_name, index, extension)
}

fn write_reversed_copy(entry: &ReversedEntry, dest: &Path) -> Result<()> {
    fs::copy(&entry.source, dest).with_context(|| format!("cannot copy to {}", dest.display()))?;

    let source_name = entry
        .source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    sequencing::prepend_lines(dest, &[format!("### Reversed file from: {}", source_name)])?;
    Ok(())
}

/// Reverse the diffractograms of `folder` into `<pattern>_REVERSE`.
///
/// A file that cannot be copied or annotated is logged and skipped.
///
/// # Errors
///
/// Fails when the folder holds no diffractogram, when the pattern cannot be
/// derived or when a file name has no index after the pattern.
pub fn reverse_folder(folder: &Path, pattern: &PatternSource, extension: &str) -> Result<BatchReport> {
    let extension = extension.trim_start_matches('.');
    let files = sequencing::list_files(folder, extension)?;

    let first = files.first().ok_or_else(|| ReverseError::NoFiles {
        folder: folder.to_path_buf(),
        extension: extension.to_string(),
    })?;
    let pattern = pattern.resolve(first)?;

    info!("Reversing {} diffractograms", files.len());

    let sequence = build_reversed_sequence(&files, &pattern)?;

    let folder_name = naming::reverse_folder_name(&pattern);
    let destination = folder.join(&folder_name);
    sequencing::ensure_folder(&destination)?;

    let mut report = BatchReport::default();
    for entry in &sequence {
        let dest = destination.join(reversed_filename(&folder_name, entry.index, extension));
        debug!("Processing: {} -> {}", entry.source.display(), dest.display());

        match write_reversed_copy(entry, &dest) {
            Ok(()) => {
                report.record_success(&entry.source);
                report.outputs.push(dest);
            }
            Err(e) => report.record_failure(&entry.source, format!("{:#}", e)),
        }
    }
    report.destination = Some(destination);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_build_reversed_sequence_sorts_numerically() {
        let files = paths(&["S_10.dat", "S_2.dat", "S_1.dat", "S_9.dat"]);

        let sequence = build_reversed_sequence(&files, "S").unwrap();

        let order: Vec<(&str, usize)> = sequence
            .iter()
            .map(|e| (e.source.to_str().unwrap(), e.index))
            .collect();
        assert_eq!(order, vec![("S_10.dat", 1), ("S_9.dat", 2), ("S_2.dat", 3), ("S_1.dat", 4)]);
    }

    #[test]
    fn test_reversed_index_maps_to_opposite_rank() {
        let n = 7;
        let files: Vec<PathBuf> = (1..=n).map(|i| PathBuf::from(format!("P_{:03}.dat", i))).collect();

        let sequence = build_reversed_sequence(&files, "P").unwrap();

        for entry in &sequence {
            let rank = n + 1 - entry.index;
            assert_eq!(entry.source, files[rank - 1]);
        }
    }

    #[test]
    fn test_build_reversed_sequence_rejects_foreign_file() {
        let files = paths(&["S_1.dat", "notes.dat"]);
        assert!(build_reversed_sequence(&files, "S").is_err());
    }

    #[test]
    fn test_reverse_folder() {
        let temp_dir = TempDir::new().unwrap();
        for i in 1..=3 {
            fs::write(temp_dir.path().join(format!("Run_{}.dat", i)), format!("{}.0  {}.0\n", i, i)).unwrap();
        }
        fs::write(temp_dir.path().join("Run.poni"), "").unwrap();

        let report = reverse_folder(temp_dir.path(), &PatternSource::Delimited, "dat").unwrap();

        let dest = temp_dir.path().join("Run_REVERSE");
        assert_eq!(report.destination.as_deref(), Some(dest.as_path()));
        assert_eq!(report.outputs.len(), 3);
        assert!(report.is_clean());

        let first = fs::read_to_string(dest.join("Run_REVERSE_1.dat")).unwrap();
        assert_eq!(first, "### Reversed file from: Run_3.dat\n3.0  3.0\n");
        let last = fs::read_to_string(dest.join("Run_REVERSE_3.dat")).unwrap();
        assert_eq!(last, "### Reversed file from: Run_1.dat\n1.0  1.0\n");

        // originals are left in place
        assert!(temp_dir.path().join("Run_1.dat").exists());
    }

    #[test]
    fn test_reverse_empty_folder() {
        let temp_dir = TempDir::new().unwrap();
        let result = reverse_folder(temp_dir.path(), &PatternSource::Delimited, "dat");
        assert!(result.is_err());
        assert!(!temp_dir.path().join("_REVERSE").exists());
    }

    #[test]
    fn test_foreign_name_leaves_no_reverse_folder() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("S_1.dat"), "1.0  1.0\n").unwrap();
        fs::write(temp_dir.path().join("notes.dat"), "").unwrap();

        let result = reverse_folder(temp_dir.path(), &PatternSource::Delimited, "dat");

        assert!(result.is_err());
        assert!(!temp_dir.path().join("S_REVERSE").exists());
    }
}
