use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A dependency that may contribute resource identifiers.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LibraryDescriptor {
    /// Manifest used to discover the library's package name.
    pub manifest: Option<PathBuf>,
    /// The library's `R.txt`. Absent or missing when the library has no resources.
    pub symbol_file: Option<PathBuf>,
}

impl LibraryDescriptor {
    pub fn new(manifest: impl Into<PathBuf>, symbol_file: impl Into<PathBuf>) -> Self {
        Self {
            manifest: Some(manifest.into()),
            symbol_file: Some(symbol_file.into()),
        }
    }

    /// True when the symbol file is declared and exists as a regular file.
    pub fn has_symbols(&self) -> bool {
        self.symbol_file.as_deref().is_some_and(Path::is_file)
    }
}

/// Resource, asset and manifest inputs of the project being built.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryData {
    pub resource_dirs: Vec<PathBuf>,
    pub asset_dirs: Vec<PathBuf>,
    pub manifest: PathBuf,
}

/// Resource, asset, manifest and symbol inputs contributed by one dependency.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyData {
    pub resource_dirs: Vec<PathBuf>,
    pub asset_dirs: Vec<PathBuf>,
    pub manifest: PathBuf,
    pub symbol_file: Option<PathBuf>,
}

impl DependencyData {
    pub fn as_library(&self) -> LibraryDescriptor {
        LibraryDescriptor {
            manifest: Some(self.manifest.clone()),
            symbol_file: self.symbol_file.clone(),
        }
    }

    /// Label used to name this dependency's merge set.
    pub fn label(&self) -> String {
        self.manifest.display().to_string()
    }
}

/// Parses `res[#res...]:assets[#assets...]:manifest[:R.txt]`. Empty directory lists are allowed.
impl FromStr for DependencyData {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if !(3..=4).contains(&parts.len()) || parts[2].is_empty() {
            return Err(ModelError::InvalidLibrary(s.to_string()));
        }

        let dirs = |raw: &str| -> Vec<PathBuf> {
            raw.split('#')
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .collect()
        };

        Ok(Self {
            resource_dirs: dirs(parts[0]),
            asset_dirs: dirs(parts[1]),
            manifest: PathBuf::from(parts[2]),
            symbol_file: parts
                .get(3)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Output of the resource/asset merge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MergedData {
    pub resource_dir: PathBuf,
    pub asset_dir: PathBuf,
    pub manifest: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dependency() {
        let dep: DependencyData = "lib/res#lib/res2:lib/assets:lib/AndroidManifest.xml:lib/R.txt"
            .parse()
            .unwrap();
        assert_eq!(
            dep.resource_dirs,
            vec![PathBuf::from("lib/res"), PathBuf::from("lib/res2")]
        );
        assert_eq!(dep.asset_dirs, vec![PathBuf::from("lib/assets")]);
        assert_eq!(dep.symbol_file, Some(PathBuf::from("lib/R.txt")));
        assert_eq!(
            dep.as_library().manifest,
            Some(PathBuf::from("lib/AndroidManifest.xml"))
        );
    }

    #[test]
    fn test_parse_dependency_without_symbols() {
        let dep: DependencyData = "::AndroidManifest.xml".parse().unwrap();
        assert!(dep.resource_dirs.is_empty());
        assert!(dep.asset_dirs.is_empty());
        assert!(dep.symbol_file.is_none());
    }

    #[test]
    fn test_parse_dependency_requires_manifest() {
        assert!("res:assets".parse::<DependencyData>().is_err());
        assert!("res:assets::R.txt".parse::<DependencyData>().is_err());
    }

    #[test]
    fn test_missing_symbol_file_has_no_symbols() {
        let lib = LibraryDescriptor::new("AndroidManifest.xml", "/definitely/not/here/R.txt");
        assert!(!lib.has_symbols());
        assert!(!LibraryDescriptor::default().has_symbols());
    }
}
