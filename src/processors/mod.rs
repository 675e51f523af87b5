//! Batch workflows built on the core types.

pub mod buffer;
pub mod integration;
pub mod report;
pub mod reverse;
pub mod selection;
pub mod sequencing;

// Re-export key types for convenience
pub use buffer::{create_buffer, BufferError, BufferSelection};
pub use integration::{IntegrationMode, IntegrationRequest, PatternSource, PipelineError};
pub use report::{BatchReport, FailedItem};
pub use reverse::{reverse_folder, ReverseError};
pub use selection::{scan, ImageFile, Selection, SelectionError};
pub use sequencing::SequencingError;
