//! Shared utilities for the rhizome workspace: the 2D buffer used as the
//! intensity grid, text (de)serialization helpers and logging setup.

mod buffer2;
mod file_format;
mod log_setup;

pub use buffer2::Buffer2;
pub use file_format::{
    deserialize, get_file_extension, load_file, serialize, FileExtensionError, FileFormatResult,
    SerdeFormat, SerdeFormatError, SerdeFormatResult,
};
pub use log_setup::{setup_logging, LogConfig};

pub const EPSILON: f64 = 1e-6;
