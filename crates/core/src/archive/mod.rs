//! Reproducible zip archives.
//!
//! Every entry gets a fixed timestamp and entries are visited in file-name order, so the
//! bytes of an archive depend only on the names and contents of its inputs.

pub mod jars;

pub use jars::{ClassSelector, SourceSelector, create_class_jar, create_resources_zip, create_src_jar};

use crate::error::{RespackError, Result};
use crate::util::{prepare_parent, stamp_epoch, to_entry_name};
use flate2::Crc;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Seconds added to the timestamp of `.class` entries.
///
/// Class files must look newer than the sources they came from to tools that compare
/// modification times. DOS time has two second resolution.
pub const CLASS_TIME_OFFSET_SECS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMethod {
    #[default]
    Stored,
    Deflated,
}

impl From<StorageMethod> for CompressionMethod {
    fn from(method: StorageMethod) -> Self {
        match method {
            StorageMethod::Stored => CompressionMethod::Stored,
            StorageMethod::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// What was written for one member of an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub name: String,
    pub crc32: u32,
    pub size: u64,
    pub method: StorageMethod,
    pub modified: DateTime,
}

/// Chooses which files of a tree go into an archive and how their contents are rewritten.
pub trait EntrySelector {
    fn select(&self, path: &Path) -> bool;

    fn transform(&self, _path: &Path, contents: Vec<u8>) -> Result<Vec<u8>> {
        Ok(contents)
    }
}

/// Selects every regular file unchanged.
pub struct AllFiles;

impl EntrySelector for AllFiles {
    fn select(&self, _path: &Path) -> bool {
        true
    }
}

/// The normalized modification time of an entry.
pub fn entry_time(name: &str) -> Result<DateTime> {
    let seconds = if name.ends_with(".class") {
        CLASS_TIME_OFFSET_SECS
    } else {
        0
    };
    DateTime::from_date_and_time(1980, 1, 1, 0, 0, seconds)
        .map_err(|e| RespackError::Internal(format!("invalid entry time: {e}")))
}

pub struct ArchiveBuilder {
    path: PathBuf,
    writer: ZipWriter<File>,
    method: StorageMethod,
    stored_extensions: Vec<String>,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveBuilder {
    /// Creates the archive file, and its parent directories when missing.
    pub fn create(path: &Path) -> Result<Self> {
        prepare_parent(path)?;
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: ZipWriter::new(file),
            method: StorageMethod::default(),
            stored_extensions: Vec::new(),
            entries: Vec::new(),
        })
    }

    pub fn with_compression(mut self, method: StorageMethod) -> Self {
        self.method = method;
        self
    }

    /// Entries whose names end in one of `extensions` are always stored uncompressed.
    pub fn with_stored_extensions(mut self, extensions: &[String]) -> Self {
        self.stored_extensions = extensions
            .iter()
            .filter(|ext| !ext.is_empty())
            .map(|ext| ext.to_lowercase())
            .collect();
        self
    }

    fn method_for(&self, name: &str) -> StorageMethod {
        let lower = name.to_lowercase();
        if self.stored_extensions.iter().any(|ext| lower.ends_with(ext)) {
            StorageMethod::Stored
        } else {
            self.method
        }
    }

    /// Appends one entry.
    pub fn add_entry(&mut self, name: &str, contents: &[u8]) -> Result<()> {
        let method = self.method_for(name);
        let modified = entry_time(name)?;
        let options = SimpleFileOptions::default()
            .compression_method(method.into())
            .last_modified_time(modified);

        self.writer.start_file(name, options)?;
        self.writer.write_all(contents)?;

        let mut crc = Crc::new();
        crc.update(contents);
        self.entries.push(ArchiveEntry {
            name: name.to_string(),
            crc32: crc.sum(),
            size: contents.len() as u64,
            method,
            modified,
        });
        Ok(())
    }

    /// Appends every selected file under `root`, named by its root-relative path and
    /// prefixed with `prefix/` when given. A missing root adds nothing.
    pub fn add_tree(
        &mut self,
        root: &Path,
        prefix: Option<&str>,
        selector: &dyn EntrySelector,
    ) -> Result<usize> {
        if !root.is_dir() {
            debug!("Skipping missing archive root {}", root.display());
            return Ok(0);
        }

        let mut added = 0;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() || !selector.select(entry.path()) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| RespackError::Internal(e.to_string()))?;
            let name = match prefix {
                Some(prefix) => format!("{}/{}", prefix, to_entry_name(relative)),
                None => to_entry_name(relative),
            };
            let contents = selector.transform(entry.path(), fs::read(entry.path())?)?;
            self.add_entry(&name, &contents)?;
            added += 1;
        }
        Ok(added)
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Closes the archive and stamps the file itself to the epoch.
    pub fn finish(self) -> Result<Vec<ArchiveEntry>> {
        let file = self.writer.finish()?;
        file.sync_all()?;
        drop(file);
        stamp_epoch(&self.path)?;
        debug!(
            "Wrote {} entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::time::SystemTime;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn read_back(path: &Path) -> Vec<(String, Vec<u8>, u32)> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut contents = Vec::new();
                file.read_to_end(&mut contents).unwrap();
                (file.name().to_string(), contents, file.crc32())
            })
            .collect()
    }

    #[test]
    fn test_tree_entries_sorted_and_prefixed() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("res");
        fs::create_dir_all(root.join("values")).unwrap();
        fs::create_dir_all(root.join("drawable")).unwrap();
        fs::write(root.join("values/strings.xml"), "<resources/>").unwrap();
        fs::write(root.join("drawable/b.xml"), "b").unwrap();
        fs::write(root.join("drawable/a.xml"), "a").unwrap();

        let out = dir.path().join("out/res.zip");
        let mut builder = ArchiveBuilder::create(&out).unwrap();
        assert_eq!(builder.add_tree(&root, Some("res"), &AllFiles).unwrap(), 3);
        let entries = builder.finish().unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["res/drawable/a.xml", "res/drawable/b.xml", "res/values/strings.xml"]
        );
        let read: Vec<_> = read_back(&out).into_iter().map(|(name, _, _)| name).collect();
        assert_eq!(read, names);
    }

    #[test]
    fn test_checksums_match_contents() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("a.zip");
        let mut builder = ArchiveBuilder::create(&out).unwrap();
        builder.add_entry("one.txt", b"hello").unwrap();
        builder.add_entry("two.txt", b"").unwrap();
        let entries = builder.finish().unwrap();

        for ((name, contents, crc32), entry) in read_back(&out).into_iter().zip(&entries) {
            let mut crc = Crc::new();
            crc.update(&contents);
            assert_eq!(name, entry.name);
            assert_eq!(crc.sum(), crc32);
            assert_eq!(entry.crc32, crc32);
            assert_eq!(entry.size, contents.len() as u64);
        }
    }

    #[test]
    fn test_stored_extensions() {
        let dir = tempdir().unwrap();
        let mut builder = ArchiveBuilder::create(&dir.path().join("a.zip"))
            .unwrap()
            .with_compression(StorageMethod::Deflated)
            .with_stored_extensions(&[".PNG".to_string()]);
        builder.add_entry("res/icon.png", b"png").unwrap();
        builder.add_entry("res/layout.xml", b"xml").unwrap();

        let methods: Vec<_> = builder.entries().iter().map(|e| e.method).collect();
        assert_eq!(methods, vec![StorageMethod::Stored, StorageMethod::Deflated]);
    }

    #[test]
    fn test_class_entries_are_newer() {
        let plain = entry_time("a/R.java").unwrap();
        let class = entry_time("a/R.class").unwrap();
        assert_eq!(plain.year(), 1980);
        assert_eq!(plain.second(), 0);
        assert_eq!(class.second(), CLASS_TIME_OFFSET_SECS);
    }

    #[test]
    fn test_same_inputs_same_bytes() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("com")).unwrap();
        fs::write(root.join("com/A.txt"), "a").unwrap();
        fs::write(root.join("B.txt"), "b").unwrap();

        let first = dir.path().join("first.zip");
        let second = dir.path().join("second.zip");
        for out in [&first, &second] {
            let mut builder = ArchiveBuilder::create(out).unwrap();
            builder.add_tree(&root, None, &AllFiles).unwrap();
            builder.finish().unwrap();
        }

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
        let modified = fs::metadata(&first).unwrap().modified().unwrap();
        assert_eq!(modified, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_missing_root_adds_nothing() {
        let dir = tempdir().unwrap();
        let mut builder = ArchiveBuilder::create(&dir.path().join("a.zip")).unwrap();
        let added = builder
            .add_tree(&dir.path().join("absent"), Some("assets"), &AllFiles)
            .unwrap();
        assert_eq!(added, 0);
        assert!(builder.finish().unwrap().is_empty());
    }
}
