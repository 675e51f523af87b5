//! Reader for integrated diffractogram text files.
//!
//! Files are whitespace-separated columns with `#`-prefixed comment lines.
//! The reader keeps every line in order so a file can be rewritten with only
//! its intensity column changed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error reading '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row {line} in '{}': {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// One line of a diffractogram file.
#[derive(Debug, Clone, PartialEq)]
pub enum DataLine {
    /// Comment or blank line, kept verbatim.
    Passthrough(String),
    /// Numeric row: the angle token as written, then one count per
    /// intensity column (one per sector in a full-integration file).
    Row { angle: String, intensities: Vec<f64> },
}

/// Parsed diffractogram file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataFile {
    pub lines: Vec<DataLine>,
}

impl DataFile {
    /// Iterate over the numeric rows as (angle, first intensity) pairs.
    pub fn rows(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lines.iter().filter_map(|line| match line {
            DataLine::Row { angle, intensities } => angle
                .parse::<f64>()
                .ok()
                .zip(intensities.first().copied()),
            DataLine::Passthrough(_) => None,
        })
    }

    /// Comment lines, in file order.
    pub fn comments(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines.iter().filter_map(|line| match line {
            DataLine::Passthrough(text) if text.starts_with('#') => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Parse one non-comment line.
fn parse_row(text: &str) -> std::result::Result<DataLine, String> {
    let fields: Vec<&str> = text.split_whitespace().collect();

    if fields.len() < 2 {
        return Err(format!("expected at least 2 columns, found {}", fields.len()));
    }

    fields[0]
        .parse::<f64>()
        .map_err(|_| format!("invalid angle value: {}", fields[0]))?;

    let intensities = fields[1..]
        .iter()
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|_| format!("invalid intensity value: {}", field))
        })
        .collect::<std::result::Result<Vec<f64>, String>>()?;

    Ok(DataLine::Row {
        angle: fields[0].to_string(),
        intensities,
    })
}

/// Load a two-column (or wider) diffractogram file.
///
/// # Errors
///
/// Returns [`LoaderError::MalformedRow`] for the first data row with fewer
/// than two columns or a non-numeric value.
pub fn load_data_file<P: AsRef<Path>>(path: P) -> Result<DataFile> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut lines = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if line.starts_with('#') || line.trim().is_empty() {
            lines.push(DataLine::Passthrough(line));
            continue;
        }

        let row = parse_row(&line).map_err(|reason| LoaderError::MalformedRow {
            path: path.to_path_buf(),
            line: number + 1,
            reason,
        })?;
        lines.push(row);
    }

    Ok(DataFile { lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_data_file() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "### Original file: Sample_2.dat").unwrap();
        writeln!(file, "10.000000  5.0000").unwrap();
        writeln!(file, "10.500000  7.2500").unwrap();
        file.flush().unwrap();

        let data = load_data_file(file.path())?;
        assert_eq!(data.lines.len(), 3);
        assert_eq!(data.comments().collect::<Vec<_>>(), vec!["### Original file: Sample_2.dat"]);

        let rows: Vec<(f64, f64)> = data.rows().collect();
        assert_eq!(rows, vec![(10.0, 5.0), (10.5, 7.25)]);

        Ok(())
    }

    #[test]
    fn test_every_sector_column_is_read() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0 2.0 3.0 4.0").unwrap();
        file.flush().unwrap();

        let data = load_data_file(file.path())?;
        assert_eq!(
            data.lines[0],
            DataLine::Row {
                angle: "1.0".to_string(),
                intensities: vec![2.0, 3.0, 4.0],
            }
        );
        assert_eq!(data.rows().collect::<Vec<_>>(), vec![(1.0, 2.0)]);

        Ok(())
    }

    #[test]
    fn test_single_column_row_is_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# header").unwrap();
        writeln!(file, "1.0").unwrap();
        file.flush().unwrap();

        match load_data_file(file.path()).unwrap_err() {
            LoaderError::MalformedRow { line, .. } => assert_eq!(line, 2),
            other => panic!("Expected MalformedRow, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_intensity_is_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0 abc").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_data_file(file.path()),
            Err(LoaderError::MalformedRow { line: 1, .. })
        ));
    }

    #[test]
    fn test_non_numeric_sector_column_is_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0 2.0 n/a").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_data_file(file.path()),
            Err(LoaderError::MalformedRow { line: 1, .. })
        ));
    }
}
