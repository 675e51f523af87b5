//! Interfaces to the external image decoder and azimuthal integrator.
//!
//! Decoding detector formats and the geometric integration itself live
//! outside this crate. The pipeline only needs the two traits below plus an
//! opaque [`Calibration`] handle that it threads through to the integrator.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::windows::AngleWindow;

/// Errors reported by decoder and integrator backends.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("failed to decode image '{}': {reason}", .path.display())]
    ImageDecode { path: PathBuf, reason: String },

    #[error("integration of '{}' failed: {reason}", .path.display())]
    Integration { path: PathBuf, reason: String },

    #[error("angle grids differ between windows: {expected} points vs {found}")]
    GridMismatch { expected: usize, found: usize },

    #[error("failed to read calibration '{}': {source}", .path.display())]
    Calibration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Detector geometry descriptor (a `.poni` file), kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibration {
    /// File the descriptor was read from.
    pub path: PathBuf,
    /// Raw descriptor text, interpreted only by the integrator.
    pub contents: String,
}

impl Calibration {
    /// Read a calibration file without interpreting it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| IntegrationError::Calibration {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            contents,
        })
    }
}

/// A decoded 2D detector frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: usize,
    pub height: usize,
    /// Row-major pixel values.
    pub pixels: Vec<f64>,
    /// Source file, used in log and error messages.
    pub source: PathBuf,
}

/// Counts versus 2θ for one azimuthal range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    pub angles: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl Profile {
    pub fn new(angles: Vec<f64>, intensities: Vec<f64>) -> Self {
        Self { angles, intensities }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Add the intensities of `other` point by point.
    ///
    /// An empty profile is seeded with `other` as-is. Afterwards both grids
    /// must have the same length.
    pub fn accumulate(&mut self, other: Profile) -> Result<()> {
        if self.is_empty() {
            *self = other;
            return Ok(());
        }

        if other.intensities.len() != self.intensities.len() {
            return Err(IntegrationError::GridMismatch {
                expected: self.intensities.len(),
                found: other.intensities.len(),
            });
        }

        for (acc, value) in self.intensities.iter_mut().zip(other.intensities) {
            *acc += value;
        }
        Ok(())
    }
}

/// Result of a full 2D ("cake") integration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cake {
    /// 2θ value of each radial point.
    pub radial: Vec<f64>,
    /// Centre angle of each azimuthal sector.
    pub azimuthal: Vec<f64>,
    /// Counts indexed as `intensities[sector][radial_point]`.
    pub intensities: Vec<Vec<f64>>,
}

/// Turns a detector image file into pixel data.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<ImageData>;
}

/// Reduces a detector image to counts versus 2θ.
pub trait Integrator {
    /// Integrate over one azimuthal window.
    fn integrate_1d(
        &self,
        calibration: &Calibration,
        image: &ImageData,
        dark: Option<&ImageData>,
        points: usize,
        window: AngleWindow,
    ) -> Result<Profile>;

    /// Integrate the full circle into `sectors` azimuthal sectors.
    fn integrate_2d(
        &self,
        calibration: &Calibration,
        image: &ImageData,
        dark: Option<&ImageData>,
        points: usize,
        sectors: usize,
    ) -> Result<Cake>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_accumulate_seeds_then_sums() {
        let mut acc = Profile::default();
        acc.accumulate(Profile::new(vec![1.0, 2.0], vec![10.0, 20.0])).unwrap();
        acc.accumulate(Profile::new(vec![1.0, 2.0], vec![1.5, 2.5])).unwrap();

        assert_eq!(acc.angles, vec![1.0, 2.0]);
        assert_eq!(acc.intensities, vec![11.5, 22.5]);
    }

    #[test]
    fn test_accumulate_rejects_mismatched_grid() {
        let mut acc = Profile::new(vec![1.0, 2.0], vec![1.0, 1.0]);
        let err = acc.accumulate(Profile::new(vec![1.0], vec![1.0])).unwrap_err();
        assert!(matches!(err, IntegrationError::GridMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn test_calibration_is_read_verbatim() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Distance: 0.1\nPixelSize1: 7.5e-05\n").unwrap();
        file.flush().unwrap();

        let calibration = Calibration::load(file.path()).unwrap();
        assert_eq!(calibration.contents, "Distance: 0.1\nPixelSize1: 7.5e-05\n");
        assert_eq!(calibration.path, file.path());
    }

    #[test]
    fn test_calibration_missing_file() {
        let err = Calibration::load("/nonexistent/detector.poni").unwrap_err();
        assert!(matches!(err, IntegrationError::Calibration { .. }));
    }
}
