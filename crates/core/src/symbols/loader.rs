use super::pool::{WorkerPool, default_threads};
use crate::error::Result;
use crate::manifest::manifest_package;
use indexmap::IndexMap;
use respack_api::{LibraryDescriptor, SymbolTable};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Library symbol tables grouped by the package they are generated into.
///
/// Packages keep first-registration order and each package keeps its tables in
/// registration order.
#[derive(Debug, Default)]
pub struct PackageSymbolGroup {
    packages: IndexMap<String, Vec<SymbolTable>>,
}

impl PackageSymbolGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, package: impl Into<String>, table: SymbolTable) {
        self.packages.entry(package.into()).or_default().push(table);
    }

    pub fn get(&self, package: &str) -> Option<&[SymbolTable]> {
        self.packages.get(package).map(Vec::as_slice)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SymbolTable])> {
        self.packages
            .iter()
            .map(|(package, tables)| (package.as_str(), tables.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[derive(Debug)]
pub struct LoadedSymbols {
    pub groups: PackageSymbolGroup,
    /// The project's own table. `None` when the master `R.txt` was not produced.
    pub master: Option<SymbolTable>,
}

fn parse_table(path: &Path) -> Result<SymbolTable> {
    let text = fs::read_to_string(path)?;
    Ok(SymbolTable::parse(&text)?)
}

pub struct SymbolTableLoader {
    threads: usize,
}

impl Default for SymbolTableLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTableLoader {
    pub fn new() -> Self {
        Self {
            threads: default_threads(),
        }
    }

    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    /// Loads every library table that belongs to a package other than `app_package`,
    /// together with the master table at `master_path`.
    pub fn load(
        &self,
        libraries: &[LibraryDescriptor],
        app_package: &str,
        master_path: &Path,
    ) -> Result<LoadedSymbols> {
        WorkerPool::scoped(self.threads, |pool| {
            self.load_with(pool, libraries, app_package, master_path)
        })
    }

    fn load_with(
        &self,
        pool: &WorkerPool,
        libraries: &[LibraryDescriptor],
        app_package: &str,
        master_path: &Path,
    ) -> Result<LoadedSymbols> {
        let with_manifest: Vec<(&LibraryDescriptor, &Path)> = libraries
            .iter()
            .filter_map(|lib| lib.manifest.as_deref().map(|manifest| (lib, manifest)))
            .collect();

        let packages = pool.run_all("load package name", with_manifest, |(lib, manifest)| {
            manifest_package(manifest).map(|package| (lib, package))
        })?;

        let mut registered: Vec<(String, PathBuf)> = Vec::new();
        for (lib, package) in packages {
            // The master table already carries this package's final ids.
            if package == app_package {
                debug!("Skipping library in app package {}", package);
                continue;
            }
            match lib.symbol_file.as_deref() {
                Some(symbols) if lib.has_symbols() => {
                    registered.push((package, symbols.to_path_buf()));
                }
                _ => debug!("Library {} has no symbol table", package),
            }
        }

        let master_exists = master_path.is_file();
        let mut to_parse: Vec<&Path> = registered.iter().map(|(_, path)| path.as_path()).collect();
        if master_exists {
            to_parse.push(master_path);
        }

        let mut tables = pool
            .run_all("load symbol file", to_parse, parse_table)?
            .into_iter();

        let mut groups = PackageSymbolGroup::new();
        for ((package, _), table) in registered.into_iter().zip(tables.by_ref()) {
            groups.add(package, table);
        }
        let master = if master_exists { tables.next() } else { None };

        info!(
            "Loaded symbols for {} packages from {} libraries (master table: {})",
            groups.len(),
            libraries.len(),
            if master.is_some() { "present" } else { "absent" }
        );
        Ok(LoadedSymbols { groups, master })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RespackError;
    use tempfile::tempdir;

    fn write_library(
        dir: &Path,
        name: &str,
        package: &str,
        symbols: Option<&str>,
    ) -> LibraryDescriptor {
        let lib_dir = dir.join(name);
        fs::create_dir_all(&lib_dir).unwrap();
        let manifest = lib_dir.join("AndroidManifest.xml");
        fs::write(&manifest, format!(r#"<manifest package="{package}"/>"#)).unwrap();
        let symbol_file = lib_dir.join("R.txt");
        if let Some(symbols) = symbols {
            fs::write(&symbol_file, symbols).unwrap();
        }
        LibraryDescriptor::new(manifest, symbol_file)
    }

    #[test]
    fn test_groups_by_package_and_skips_app_package() {
        let dir = tempdir().unwrap();
        let libs = vec![
            write_library(dir.path(), "a", "com.lib.a", Some("int string a 0x1\n")),
            write_library(dir.path(), "app", "com.app", Some("int string x 0x1\n")),
            write_library(dir.path(), "b", "com.lib.a", Some("int string b 0x1\n")),
            write_library(dir.path(), "c", "com.lib.c", None),
        ];
        let master = dir.path().join("R.txt");
        fs::write(&master, "int string a 0x7f010000\nint string b 0x7f010001\n").unwrap();

        let loaded = SymbolTableLoader::with_threads(2)
            .load(&libs, "com.app", &master)
            .unwrap();

        assert_eq!(loaded.groups.packages().collect::<Vec<_>>(), vec!["com.lib.a"]);
        assert!(!loaded.groups.contains("com.app"));
        assert!(!loaded.groups.contains("com.lib.c"));

        let tables = loaded.groups.get("com.lib.a").unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].iter().next().unwrap().name(), "a");
        assert_eq!(tables[1].iter().next().unwrap().name(), "b");
        assert_eq!(loaded.master.unwrap().len(), 2);
    }

    #[test]
    fn test_missing_master_is_none() {
        let dir = tempdir().unwrap();
        let libs = vec![write_library(dir.path(), "a", "com.lib.a", Some("int id a 0x1\n"))];

        let loaded = SymbolTableLoader::with_threads(1)
            .load(&libs, "com.app", &dir.path().join("missing/R.txt"))
            .unwrap();

        assert!(loaded.master.is_none());
        assert_eq!(loaded.groups.len(), 1);
    }

    #[test]
    fn test_symbol_path_that_is_a_directory_is_skipped() {
        let dir = tempdir().unwrap();
        let lib = write_library(dir.path(), "a", "com.lib.a", None);
        let symbol_dir = lib.symbol_file.clone().unwrap();
        fs::create_dir_all(&symbol_dir).unwrap();

        let loaded = SymbolTableLoader::with_threads(1)
            .load(&[lib], "com.app", &dir.path().join("R.txt"))
            .unwrap();
        assert!(loaded.groups.is_empty());
    }

    #[test]
    fn test_descriptor_without_manifest_is_ignored() {
        let dir = tempdir().unwrap();
        let libs = vec![LibraryDescriptor {
            manifest: None,
            symbol_file: Some(dir.path().join("R.txt")),
        }];

        let loaded = SymbolTableLoader::with_threads(1)
            .load(&libs, "com.app", &dir.path().join("R.txt"))
            .unwrap();
        assert!(loaded.groups.is_empty());
    }

    #[test]
    fn test_bad_manifest_fails_whole_load() {
        let dir = tempdir().unwrap();
        let good = write_library(dir.path(), "a", "com.lib.a", Some("int id a 0x1\n"));
        let bad_manifest = dir.path().join("bad.xml");
        fs::write(&bad_manifest, "<manifest/>").unwrap();
        let bad = LibraryDescriptor::new(&bad_manifest, dir.path().join("none.txt"));

        let err = SymbolTableLoader::with_threads(2)
            .load(&[good, bad], "com.app", &dir.path().join("R.txt"))
            .unwrap_err();

        match err {
            RespackError::Load { phase, failures } => {
                assert_eq!(phase, "load package name");
                assert_eq!(failures.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_table_fails_whole_load() {
        let dir = tempdir().unwrap();
        let libs = vec![write_library(dir.path(), "a", "com.lib.a", Some("garbage\n"))];

        let err = SymbolTableLoader::with_threads(1)
            .load(&libs, "com.app", &dir.path().join("R.txt"))
            .unwrap_err();
        assert!(matches!(err, RespackError::Load { phase: "load symbol file", .. }));
    }
}
