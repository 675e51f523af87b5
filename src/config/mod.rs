//! Configuration types for the integration pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for integrating detector images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Number of 2θ points per 1D diffractogram
    #[serde(default = "default_points")]
    pub points: usize,

    /// Azimuthal sectors in a full (360°) integration
    #[serde(default = "default_sectors")]
    pub sectors: usize,

    /// Extension of the raw detector images
    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Extension of the integrated diffractograms
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
}

fn default_points() -> usize {
    6000
}

fn default_sectors() -> usize {
    1
}

fn default_image_extension() -> String {
    "cbf".to_string()
}

fn default_output_extension() -> String {
    "dat".to_string()
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            points: default_points(),
            sectors: default_sectors(),
            image_extension: default_image_extension(),
            output_extension: default_output_extension(),
        }
    }
}

/// Settings for moving, correcting and renaming outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencingConfig {
    /// Uniform intensity shift added to every output
    #[serde(default)]
    pub intensity_offset: f64,

    /// Times a moved file is looked up before the move is declared incomplete
    #[serde(default = "default_move_check_attempts")]
    pub move_check_attempts: u32,

    /// Delay between two lookups, in milliseconds
    #[serde(default = "default_move_check_interval_ms")]
    pub move_check_interval_ms: u64,
}

fn default_move_check_attempts() -> u32 {
    20
}

fn default_move_check_interval_ms() -> u64 {
    50
}

impl SequencingConfig {
    pub fn move_check_interval(&self) -> Duration {
        Duration::from_millis(self.move_check_interval_ms)
    }
}

impl Default for SequencingConfig {
    fn default() -> Self {
        Self {
            intensity_offset: 0.0,
            move_check_attempts: default_move_check_attempts(),
            move_check_interval_ms: default_move_check_interval_ms(),
        }
    }
}

/// Settings for WinPLOTR buffer files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Buffer name, written as `<file_name>.buf`
    #[serde(default = "default_buffer_name")]
    pub file_name: String,
}

fn default_buffer_name() -> String {
    "buffer".to_string()
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            file_name: default_buffer_name(),
        }
    }
}

/// Settings for the reverse workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseConfig {
    /// Extension of the diffractograms to reverse
    #[serde(default = "default_output_extension")]
    pub extension: String,
}

impl Default for ReverseConfig {
    fn default() -> Self {
        Self {
            extension: default_output_extension(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub integration: IntegrationConfig,

    #[serde(default)]
    pub sequencing: SequencingConfig,

    #[serde(default)]
    pub buffer: BufferConfig,

    #[serde(default)]
    pub reverse: ReverseConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
