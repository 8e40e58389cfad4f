//! Inputs for the resource and asset merge.
//!
//! The merge itself is done by a [`DataMerger`]; this module only decides which directories
//! go into which set and in what order. Later sets override earlier ones.

use crate::error::Result;
use respack_api::{DependencyData, MergedData, PrimaryData};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rewrites a list of input directories before they join a merge set.
pub trait DirectoryModifier: Send + Sync {
    fn modify(&self, dirs: &[PathBuf]) -> Vec<PathBuf>;
}

impl<F> DirectoryModifier for F
where
    F: Fn(&[PathBuf]) -> Vec<PathBuf> + Send + Sync,
{
    fn modify(&self, dirs: &[PathBuf]) -> Vec<PathBuf> {
        self(dirs)
    }
}

fn apply(modifiers: &[Box<dyn DirectoryModifier>], dirs: &[PathBuf]) -> Vec<PathBuf> {
    modifiers
        .iter()
        .fold(dirs.to_vec(), |dirs, modifier| modifier.modify(&dirs))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSet {
    pub name: String,
    pub dirs: Vec<PathBuf>,
}

impl MergeSet {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dirs: Vec::new(),
        }
    }
}

/// Ordered resource and asset sets handed to the merger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSets {
    pub resources: Vec<MergeSet>,
    pub assets: Vec<MergeSet>,
}

impl MergeSets {
    /// One set per dependency, in order, followed by the primary data.
    pub fn relaxed(
        primary: &PrimaryData,
        dependencies: &[DependencyData],
        modifiers: &[Box<dyn DirectoryModifier>],
    ) -> Self {
        let mut sets = Self::default();
        for dep in dependencies {
            sets.push(
                &dep.label(),
                apply(modifiers, &dep.resource_dirs),
                apply(modifiers, &dep.asset_dirs),
            );
        }
        sets.push(
            "main",
            apply(modifiers, &primary.resource_dirs),
            apply(modifiers, &primary.asset_dirs),
        );
        sets
    }

    /// A single `deps` set holding every dependency directory, followed by `main`.
    ///
    /// Dependencies then cannot override each other, only the primary data can.
    pub fn strict(
        primary: &PrimaryData,
        dependencies: &[DependencyData],
        modifiers: &[Box<dyn DirectoryModifier>],
    ) -> Self {
        let mut dep_resources = MergeSet::new("deps");
        let mut dep_assets = MergeSet::new("deps");
        for dep in dependencies {
            dep_resources.dirs.extend(apply(modifiers, &dep.resource_dirs));
            dep_assets.dirs.extend(apply(modifiers, &dep.asset_dirs));
        }

        let mut main_resources = MergeSet::new("main");
        main_resources.dirs = apply(modifiers, &primary.resource_dirs);
        let mut main_assets = MergeSet::new("main");
        main_assets.dirs = apply(modifiers, &primary.asset_dirs);

        Self {
            resources: vec![dep_resources, main_resources],
            assets: vec![dep_assets, main_assets],
        }
    }

    fn push(&mut self, name: &str, resources: Vec<PathBuf>, assets: Vec<PathBuf>) {
        self.resources.push(MergeSet {
            name: name.to_string(),
            dirs: resources,
        });
        self.assets.push(MergeSet {
            name: name.to_string(),
            dirs: assets,
        });
    }
}

/// Merges resource and asset sets into output directories.
pub trait DataMerger: Sync {
    fn merge(&self, sets: &MergeSets, resources_out: &Path, assets_out: &Path) -> Result<()>;
}

/// Builds the merge sets and runs `merger` over them.
pub fn merge_data(
    primary: &PrimaryData,
    dependencies: &[DependencyData],
    resources_out: &Path,
    assets_out: &Path,
    modifiers: &[Box<dyn DirectoryModifier>],
    merger: &dyn DataMerger,
    strict: bool,
) -> Result<MergedData> {
    let sets = if strict {
        MergeSets::strict(primary, dependencies, modifiers)
    } else {
        MergeSets::relaxed(primary, dependencies, modifiers)
    };
    debug!(
        "Merging {} resource sets and {} asset sets",
        sets.resources.len(),
        sets.assets.len()
    );
    merger.merge(&sets, resources_out, assets_out)?;
    Ok(MergedData {
        resource_dir: resources_out.to_path_buf(),
        asset_dir: assets_out.to_path_buf(),
        manifest: primary.manifest.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn primary() -> PrimaryData {
        PrimaryData {
            resource_dirs: vec![PathBuf::from("app/res")],
            asset_dirs: vec![PathBuf::from("app/assets")],
            manifest: PathBuf::from("app/AndroidManifest.xml"),
        }
    }

    fn dependency(name: &str) -> DependencyData {
        DependencyData {
            resource_dirs: vec![PathBuf::from(format!("{name}/res"))],
            asset_dirs: vec![],
            manifest: PathBuf::from(format!("{name}/AndroidManifest.xml")),
            symbol_file: None,
        }
    }

    #[test]
    fn test_relaxed_one_set_per_dependency() {
        let sets = MergeSets::relaxed(&primary(), &[dependency("a"), dependency("b")], &[]);

        let names: Vec<_> = sets.resources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["a/AndroidManifest.xml", "b/AndroidManifest.xml", "main"]
        );
        assert_eq!(sets.assets.len(), 3);
        assert_eq!(sets.resources[2].dirs, vec![PathBuf::from("app/res")]);
    }

    #[test]
    fn test_strict_deps_then_main() {
        let sets = MergeSets::strict(&primary(), &[dependency("a"), dependency("b")], &[]);

        assert_eq!(sets.resources[0].name, "deps");
        assert_eq!(
            sets.resources[0].dirs,
            vec![PathBuf::from("a/res"), PathBuf::from("b/res")]
        );
        assert_eq!(sets.resources[1].name, "main");
        assert!(sets.assets[0].dirs.is_empty());
        assert_eq!(sets.assets[1].dirs, vec![PathBuf::from("app/assets")]);
    }

    #[test]
    fn test_modifiers_apply_in_order() {
        let modifiers: Vec<Box<dyn DirectoryModifier>> = vec![
            Box::new(|dirs: &[PathBuf]| dirs.iter().map(|d| d.join("x")).collect::<Vec<_>>()),
            Box::new(|dirs: &[PathBuf]| dirs.iter().map(|d| d.join("y")).collect::<Vec<_>>()),
        ];
        let sets = MergeSets::relaxed(&primary(), &[], &modifiers);
        assert_eq!(sets.resources[0].dirs, vec![PathBuf::from("app/res/x/y")]);
    }

    struct Recording(Mutex<Vec<MergeSets>>);

    impl DataMerger for Recording {
        fn merge(&self, sets: &MergeSets, _: &Path, _: &Path) -> Result<()> {
            self.0.lock().unwrap().push(sets.clone());
            Ok(())
        }
    }

    #[test]
    fn test_merge_data_reports_outputs() {
        let merger = Recording(Mutex::new(Vec::new()));
        let merged = merge_data(
            &primary(),
            &[dependency("a")],
            Path::new("out/res"),
            Path::new("out/assets"),
            &[],
            &merger,
            true,
        )
        .unwrap();

        assert_eq!(merged.resource_dir, PathBuf::from("out/res"));
        assert_eq!(merged.manifest, PathBuf::from("app/AndroidManifest.xml"));
        let recorded = merger.0.lock().unwrap();
        assert_eq!(recorded[0].resources[0].name, "deps");
    }
}
