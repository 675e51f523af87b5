//! Filename pattern parsing and output naming.
//!
//! Detector images and diffractograms are named `<pattern><sep><index>` where
//! `<sep>` is `_` or `-`. Downstream analysis tools rely on the exact names
//! produced here, so the literal tokens (`_axis`, `_apert`, ...) must not change.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Errors raised when a filename does not follow the numbering convention.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternParseError {
    #[error("no '_' or '-' delimited trailing index in '{0}'")]
    MissingIndex(String),

    #[error("trailing token '{token}' of '{name}' is not an integer")]
    InvalidIndex { name: String, token: String },
}

/// Result type for naming operations.
pub type Result<T> = std::result::Result<T, PatternParseError>;

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[_-]").expect("separator regex is valid"))
}

/// A filename split into its base pattern and sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilenamePattern {
    /// Trailing integer token.
    pub sequence_index: u64,
    /// Remaining tokens re-joined with `_`.
    pub base_pattern: String,
}

impl FilenamePattern {
    /// Parse a file stem such as `Sample-X-000` into `{0, "Sample_X"}`.
    ///
    /// The name must contain at least one separator and its last token must
    /// be an integer.
    pub fn parse(stem: &str) -> Result<Self> {
        let tokens: Vec<&str> = separator().split(stem).collect();

        let (last, rest) = match tokens.split_last() {
            Some((last, rest)) if !rest.is_empty() => (*last, rest),
            _ => return Err(PatternParseError::MissingIndex(stem.to_string())),
        };

        let sequence_index = last
            .parse::<u64>()
            .map_err(|_| PatternParseError::InvalidIndex {
                name: stem.to_string(),
                token: last.to_string(),
            })?;

        Ok(Self {
            sequence_index,
            base_pattern: rest.join("_"),
        })
    }

    /// Parse the stem of a path, ignoring its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        Self::parse(stem)
    }
}

/// Decimation applied to a frame sequence.
///
/// A stride of 2 means every odd frame was captured while the beam was still
/// accelerating: the selector keeps indices divisible by the stride and the
/// renamer divides the surviving indices by it, so both sides of the
/// convention read the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStride(u32);

impl FrameStride {
    /// Keep every frame, keep the original numbering.
    pub const EVERY_FRAME: Self = Self(1);

    /// Acceleration frames sit at odd indices.
    pub const SKIP_ACCELERATION: Self = Self(2);

    /// A stride of `n` frames; zero is treated as one.
    pub fn new(n: u32) -> Self {
        Self(n.max(1))
    }

    /// Map the "acceleration files present" switch onto a stride.
    pub fn from_acceleration(accelerated: bool) -> Self {
        if accelerated {
            Self::SKIP_ACCELERATION
        } else {
            Self::EVERY_FRAME
        }
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// True when a stride other than one is in effect.
    #[inline]
    pub fn is_decimating(self) -> bool {
        self.0 > 1
    }

    /// Whether the frame at `index` survives decimation.
    #[inline]
    pub fn keeps(self, index: u64) -> bool {
        index % u64::from(self.0) == 0
    }

    /// Final position of a surviving frame.
    #[inline]
    pub fn collapse(self, index: u64) -> u64 {
        index / u64::from(self.0)
    }
}

impl Default for FrameStride {
    fn default() -> Self {
        Self::EVERY_FRAME
    }
}

/// Extract the numeric suffix that follows `base_pattern` in `stem`.
///
/// Separators between the pattern and the number are ignored, so both
/// `Sample_007` and `Sample-007` yield 7 for the pattern `Sample`. A derived
/// pattern such as `Fe_run` also matches `Fe-run-0007`, whose separators
/// were normalised when the pattern was parsed.
pub fn index_after_pattern(stem: &str, base_pattern: &str) -> Result<u64> {
    if !stem.starts_with(base_pattern) {
        if let Ok(parsed) = FilenamePattern::parse(stem) {
            if parsed.base_pattern == base_pattern {
                return Ok(parsed.sequence_index);
            }
        }
    }

    let remainder = stem.strip_prefix(base_pattern).unwrap_or(stem);
    let digits: String = remainder.chars().filter(|c| *c != '_' && *c != '-').collect();

    digits
        .parse::<u64>()
        .map_err(|_| PatternParseError::InvalidIndex {
            name: stem.to_string(),
            token: digits.clone(),
        })
}

/// Compute the simplified name of an output file.
///
/// `Sample_0042.dat` with pattern `Sample` becomes `Sample_42.dat`, or
/// `Sample_21.dat` under [`FrameStride::SKIP_ACCELERATION`].
pub fn rename(filename: &str, base_pattern: &str, stride: FrameStride) -> Result<String> {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let index = stride.collapse(index_after_pattern(stem, base_pattern)?);

    Ok(match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", base_pattern, index, ext),
        None => format!("{}_{}", base_pattern, index),
    })
}

/// Name of a partial-integration output, without extension.
///
/// `index` is passed through untouched.
pub fn build_azimuth_filename(base_pattern: &str, axis_degrees: u32, aperture: u32, index: &str) -> String {
    format!("{}_axis{}_apert{}_{}", base_pattern, axis_degrees, aperture, index)
}

/// Destination folder of a full (360°) integration run.
pub fn full_folder_name(base_pattern: &str) -> String {
    format!("{}_INTEG_FULL", base_pattern)
}

/// Destination folder of a partial integration run.
pub fn azimuth_folder_name(base_pattern: &str, aperture: u32) -> String {
    format!("{}_INTEG_AZIM_{}", base_pattern, aperture)
}

/// Destination folder of the reverse workflow.
pub fn reverse_folder_name(base_pattern: &str) -> String {
    format!("{}_REVERSE", base_pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_underscore() {
        let parsed = FilenamePattern::parse("Sample_12").unwrap();
        assert_eq!(parsed.sequence_index, 12);
        assert_eq!(parsed.base_pattern, "Sample");
    }

    #[test]
    fn test_parse_mixed_separators_rejoined() {
        let parsed = FilenamePattern::parse("Sample-X-000").unwrap();
        assert_eq!(parsed.sequence_index, 0);
        assert_eq!(parsed.base_pattern, "Sample_X");

        let parsed = FilenamePattern::parse("Fe_run-3_0150").unwrap();
        assert_eq!(parsed.sequence_index, 150);
        assert_eq!(parsed.base_pattern, "Fe_run_3");
    }

    #[test]
    fn test_parse_is_left_inverse_of_generator() {
        for pattern in ["Sample", "LaB6", "x"] {
            for i in [0u64, 1, 9, 10, 255, 100_000] {
                let parsed = FilenamePattern::parse(&format!("{}_{}", pattern, i)).unwrap();
                assert_eq!(parsed.sequence_index, i);
                assert_eq!(parsed.base_pattern, pattern);
            }
        }
    }

    #[test]
    fn test_parse_without_separator_fails() {
        assert_eq!(
            FilenamePattern::parse("Sample42"),
            Err(PatternParseError::MissingIndex("Sample42".to_string()))
        );
    }

    #[test]
    fn test_parse_non_numeric_tail_fails() {
        let err = FilenamePattern::parse("Sample_dark").unwrap_err();
        assert!(matches!(err, PatternParseError::InvalidIndex { ref token, .. } if token == "dark"));
    }

    #[test]
    fn test_from_path_ignores_extension() {
        let parsed = FilenamePattern::from_path(Path::new("/data/Sample_7.cbf")).unwrap();
        assert_eq!(parsed.sequence_index, 7);
        assert_eq!(parsed.base_pattern, "Sample");
    }

    #[test]
    fn test_frame_stride() {
        let stride = FrameStride::SKIP_ACCELERATION;
        assert!(stride.keeps(0));
        assert!(stride.keeps(4));
        assert!(!stride.keeps(5));
        assert_eq!(stride.collapse(10), 5);
        assert_eq!(FrameStride::new(0), FrameStride::EVERY_FRAME);
        assert_eq!(FrameStride::from_acceleration(false).collapse(7), 7);
    }

    #[test]
    fn test_rename_strips_padding() {
        assert_eq!(
            rename("Sample_0042.dat", "Sample", FrameStride::EVERY_FRAME).unwrap(),
            "Sample_42.dat"
        );
        assert_eq!(
            rename("Sample-0042.dat", "Sample", FrameStride::EVERY_FRAME).unwrap(),
            "Sample_42.dat"
        );
    }

    #[test]
    fn test_rename_accelerated_halves_index() {
        for k in [0u64, 1, 2, 17, 500] {
            let name = format!("P_{}.dat", 2 * k);
            assert_eq!(
                rename(&name, "P", FrameStride::SKIP_ACCELERATION).unwrap(),
                format!("P_{}.dat", k)
            );
        }
    }

    #[test]
    fn test_rename_rejects_foreign_names() {
        assert!(rename("Other_X_2.dat", "Sample", FrameStride::EVERY_FRAME).is_err());
    }

    #[test]
    fn test_index_after_derived_pattern_with_dashes() {
        let pattern = FilenamePattern::parse("Fe-run-0001").unwrap().base_pattern;
        assert_eq!(index_after_pattern("Fe-run-0001", &pattern).unwrap(), 1);
        assert_eq!(index_after_pattern("Fe-run-0001", "Fe-run").unwrap(), 1);
        assert_eq!(
            rename("Fe-run-0004.dat", &pattern, FrameStride::SKIP_ACCELERATION).unwrap(),
            "Fe_run_2.dat"
        );
    }

    #[test]
    fn test_build_azimuth_filename() {
        assert_eq!(build_azimuth_filename("Sample", 0, 30, "007"), "Sample_axis0_apert30_007");
        assert_eq!(build_azimuth_filename("Sample", 90, 45, "12"), "Sample_axis90_apert45_12");
    }

    #[test]
    fn test_folder_names() {
        assert_eq!(full_folder_name("Sample"), "Sample_INTEG_FULL");
        assert_eq!(azimuth_folder_name("Sample", 30), "Sample_INTEG_AZIM_30");
        assert_eq!(reverse_folder_name("Sample"), "Sample_REVERSE");
    }
}
