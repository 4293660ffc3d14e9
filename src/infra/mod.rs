//! Infrastructure shared by the library and the binary.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};
