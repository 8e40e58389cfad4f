use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of target being processed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VariantType {
    #[default]
    Default,
    Library,
    Test,
}

/// Output locations declared by the caller. Every entry is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPaths {
    /// The packaged resource archive; split archives are its `_<suffix>` siblings.
    pub package_out: Option<PathBuf>,
    pub proguard_out: Option<PathBuf>,
    pub main_dex_proguard_out: Option<PathBuf>,
    pub public_resources_out: Option<PathBuf>,
}

impl OutputPaths {
    /// Single-file outputs that get an epoch timestamp once produced.
    pub fn stamped_files(&self) -> impl Iterator<Item = &Path> {
        [
            self.proguard_out.as_deref(),
            self.main_dex_proguard_out.as_deref(),
            self.package_out.as_deref(),
            self.public_resources_out.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}
