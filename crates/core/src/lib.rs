pub mod error;
pub mod logging;
pub mod util;

pub mod archive;
pub mod config;
pub mod manifest;
pub mod merge;
pub mod processor;
pub mod splits;
pub mod symbols;

pub use config::ProcessorConfig;
pub use error::{RespackError, Result};
pub use processor::ResourceProcessor;
