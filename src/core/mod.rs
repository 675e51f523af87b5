//! Core data types, naming rules and I/O.

pub mod integrator;
pub mod loaders;
pub mod naming;
pub mod windows;
pub mod writers;

pub use integrator::{Cake, Calibration, ImageData, ImageDecoder, IntegrationError, Integrator, Profile};
pub use loaders::{load_data_file, DataFile, DataLine, LoaderError};
pub use naming::{FilenamePattern, FrameStride, PatternParseError};
pub use windows::{build_windows, AngleWindow, Axis, AxisWindowSet};
pub use writers::{write_buffer_list, write_cake, write_profile, WriteError};
