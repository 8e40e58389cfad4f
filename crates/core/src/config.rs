//! Processor configuration.
//!
//! Everything has a default so a config file only needs to name what it changes.

use crate::error::Result;
use respack_api::SplitSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    #[default]
    Auto,
    Yes,
    No,
}

/// Options handed through to the external resource compiler.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AaptConfig {
    pub use_aapt_cruncher: TriState,
    /// File extensions the compiler must store uncompressed.
    pub uncompressed_extensions: Vec<String>,
    /// Asset extensions to ignore.
    pub assets_to_ignore: Vec<String>,
    pub debug: bool,
    pub resource_configs: Vec<String>,
    /// Requested split outputs, e.g. `en-television,en-xxhdpi`.
    pub splits: Vec<String>,
}

impl AaptConfig {
    pub fn use_png_cruncher(&self) -> bool {
        self.use_aapt_cruncher != TriState::No
    }

    pub fn no_compress(&self) -> &[String] {
        &self.uncompressed_extensions
    }

    pub fn ignore_assets(&self) -> Option<String> {
        if self.assets_to_ignore.is_empty() {
            None
        } else {
            Some(self.assets_to_ignore.join(":"))
        }
    }

    pub fn fail_on_missing_config_entry(&self) -> bool {
        false
    }

    pub fn split_specs(&self) -> Result<Vec<SplitSpec>> {
        self.splits
            .iter()
            .map(|raw| SplitSpec::parse(raw).map_err(Into::into))
            .collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProcessorConfig {
    pub aapt: AaptConfig,
    /// Replace compiler-assigned ids with stable placeholders in archived outputs.
    pub static_ids: bool,
    /// Compiled R classes use constant `static final` int fields.
    pub final_fields: bool,
    /// Overrides the symbol loading pool size (`max(1, cores / 2)` otherwise).
    pub worker_threads: Option<usize>,
}

impl ProcessorConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
