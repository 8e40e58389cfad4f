use super::classfile::r_classes;
use super::java::render_r_java;
use super::loader::PackageSymbolGroup;
use crate::error::Result;
use crate::util::{prepare_parent, stamp_epoch};
use respack_api::SymbolTable;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Ids for a library package, reassigned at final link time.
    Library,
    /// The project's own package, holding every id of the master table.
    Primary,
}

/// Destination for per-package symbol artifacts.
pub trait SymbolSink {
    /// Writes the artifact(s) for one package and returns the files produced.
    fn write_package(
        &self,
        package: &str,
        table: &SymbolTable,
        kind: ArtifactKind,
    ) -> Result<Vec<PathBuf>>;
}

fn package_dir(root: &Path, package: &str) -> PathBuf {
    package
        .split('.')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |dir, segment| dir.join(segment))
}

/// Writes `<root>/<package path>/R.java`.
pub struct JavaSourceSink {
    root: PathBuf,
}

impl JavaSourceSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SymbolSink for JavaSourceSink {
    fn write_package(
        &self,
        package: &str,
        table: &SymbolTable,
        kind: ArtifactKind,
    ) -> Result<Vec<PathBuf>> {
        let path = package_dir(&self.root, package).join("R.java");
        prepare_parent(&path)?;
        fs::write(&path, render_r_java(package, table, kind == ArtifactKind::Primary))?;
        stamp_epoch(&path)?;
        Ok(vec![path])
    }
}

/// Writes `R.class` and the per-type inner classes under `<root>/<package path>/`.
pub struct ClassFileSink {
    root: PathBuf,
    final_fields: bool,
}

impl ClassFileSink {
    pub fn new(root: impl Into<PathBuf>, final_fields: bool) -> Self {
        Self {
            root: root.into(),
            final_fields,
        }
    }
}

impl SymbolSink for ClassFileSink {
    fn write_package(
        &self,
        package: &str,
        table: &SymbolTable,
        _kind: ArtifactKind,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for class in r_classes(package, table, self.final_fields)? {
            let path = self.root.join(&class.relative_path);
            prepare_parent(&path)?;
            fs::write(&path, &class.bytes)?;
            stamp_epoch(&path)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Layers `tables` in order and takes every value from `master`.
///
/// Library tables only decide which keys a package exposes; their own values are
/// placeholders. Keys missing from the master table are dropped.
pub fn resolve_package(master: &SymbolTable, tables: &[SymbolTable]) -> SymbolTable {
    let mut resolved = SymbolTable::new();
    for table in tables {
        for key in table.keys() {
            match master.get(key) {
                Some(entry) => resolved.insert(entry.clone()),
                None => debug!("Dropping {} which has no final value", key),
            }
        }
    }
    resolved
}

pub struct PackageSymbolWriter<'a, S: SymbolSink> {
    master: &'a SymbolTable,
    sink: S,
}

impl<'a, S: SymbolSink> PackageSymbolWriter<'a, S> {
    pub fn new(master: &'a SymbolTable, sink: S) -> Self {
        Self { master, sink }
    }

    /// Writes one artifact per library package, in group order.
    pub fn write_libraries(&self, groups: &PackageSymbolGroup) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (package, tables) in groups.iter() {
            let resolved = resolve_package(self.master, tables);
            written.extend(
                self.sink
                    .write_package(package, &resolved, ArtifactKind::Library)?,
            );
        }
        Ok(written)
    }

    /// Writes every library package plus the full artifact for `app_package`.
    ///
    /// The primary artifact is written even when `groups` is empty.
    pub fn write_all(&self, groups: &PackageSymbolGroup, app_package: &str) -> Result<Vec<PathBuf>> {
        let mut written = self.write_libraries(groups)?;
        written.extend(
            self.sink
                .write_package(app_package, self.master, ArtifactKind::Primary)?,
        );
        info!(
            "Wrote symbols for {} library packages and {} ({} files)",
            groups.len(),
            app_package,
            written.len()
        );
        Ok(written)
    }
}
