//! Discovery of detector images to integrate.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::core::naming::{FilenamePattern, FrameStride};

/// Errors that can occur while scanning for images.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("cannot read directory '{}': {source}", .path.display())]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A raw detector image selected for integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Full path to the image.
    pub path: PathBuf,
    /// File name without extension.
    pub stem: String,
    /// Base pattern and index, when the name follows the numbering convention.
    pub pattern: Option<FilenamePattern>,
}

impl ImageFile {
    fn from_path(path: PathBuf) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let pattern = FilenamePattern::parse(&stem).ok();
        Self { path, stem, pattern }
    }

    /// Name of the diffractogram produced by a full integration.
    pub fn output_name(&self, output_extension: &str) -> String {
        format!("{}.{}", self.stem, output_extension)
    }
}

/// Images kept by a scan, with the output names they will produce.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub images: Vec<ImageFile>,
    pub expected_outputs: Vec<String>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// Scan `directory` for images with `extension`.
///
/// With a decimating `stride`, only images whose trailing index is a
/// multiple of the stride are kept; names without a parseable index are
/// skipped with a warning. Entries are returned in directory enumeration
/// order.
///
/// # Arguments
///
/// * `directory` - Folder holding the detector images
/// * `extension` - Image extension, with or without the leading dot
/// * `stride` - Frame decimation shared with the renamer
/// * `output_extension` - Extension of the diffractograms to be produced
///
/// # Errors
///
/// Fails only when the directory cannot be read.
pub fn scan(
    directory: &Path,
    extension: &str,
    stride: FrameStride,
    output_extension: &str,
) -> Result<Selection, SelectionError> {
    let entries = fs::read_dir(directory).map_err(|source| SelectionError::UnreadableDirectory {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut selection = Selection::default();

    for path in entries.filter_map(|entry| entry.ok()).map(|entry| entry.path()) {
        if !path.is_file() || !has_extension(&path, extension) {
            continue;
        }

        let image = ImageFile::from_path(path);

        if stride.is_decimating() {
            match &image.pattern {
                Some(pattern) if stride.keeps(pattern.sequence_index) => {}
                Some(pattern) => {
                    debug!("Skipping acceleration frame {} (index {})", image.stem, pattern.sequence_index);
                    continue;
                }
                None => {
                    warn!("Skipping {}: no trailing frame index", image.path.display());
                    continue;
                }
            }
        }

        selection.expected_outputs.push(image.output_name(output_extension));
        selection.images.push(image);
    }

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    fn indices(selection: &Selection) -> Vec<u64> {
        let mut found: Vec<u64> = selection
            .images
            .iter()
            .filter_map(|img| img.pattern.as_ref().map(|p| p.sequence_index))
            .collect();
        found.sort_unstable();
        found
    }

    #[test]
    fn test_scan_filters_extension() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "Sample_1.cbf");
        touch(temp_dir.path(), "Sample_2.cbf");
        touch(temp_dir.path(), "Sample_2.dat");
        touch(temp_dir.path(), "detector.poni");
        fs::create_dir(temp_dir.path().join("Sample_3.cbf")).unwrap();

        let selection = scan(temp_dir.path(), "cbf", FrameStride::EVERY_FRAME, "dat").unwrap();

        assert_eq!(selection.len(), 2);
        assert_eq!(indices(&selection), vec![1, 2]);
        let mut outputs = selection.expected_outputs.clone();
        outputs.sort();
        assert_eq!(outputs, vec!["Sample_1.dat", "Sample_2.dat"]);
    }

    #[test]
    fn test_scan_excludes_acceleration_frames() {
        let temp_dir = TempDir::new().unwrap();
        for i in 1..=10 {
            touch(temp_dir.path(), &format!("Sample_{}.cbf", i));
        }

        let selection = scan(temp_dir.path(), ".cbf", FrameStride::SKIP_ACCELERATION, "dat").unwrap();

        assert_eq!(selection.len(), 5);
        assert_eq!(indices(&selection), vec![2, 4, 6, 8, 10]);
        assert_eq!(selection.expected_outputs.len(), 5);
    }

    #[test]
    fn test_scan_skips_unnumbered_names_when_decimating() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "Sample_2.cbf");
        touch(temp_dir.path(), "dark.cbf");

        let decimated = scan(temp_dir.path(), "cbf", FrameStride::SKIP_ACCELERATION, "dat").unwrap();
        assert_eq!(decimated.len(), 1);

        let all = scan(temp_dir.path(), "cbf", FrameStride::EVERY_FRAME, "dat").unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_scan_unreadable_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let result = scan(&missing, "cbf", FrameStride::EVERY_FRAME, "dat");
        assert!(matches!(result, Err(SelectionError::UnreadableDirectory { .. })));
    }
}
