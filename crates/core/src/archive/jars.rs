use super::{AllFiles, ArchiveBuilder, ArchiveEntry, EntrySelector};
use crate::error::Result;
use crate::symbols::static_ids::replace_ids_with_static_ids;
use std::path::Path;
use tracing::info;

pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

const JAR_MANIFEST: &str = "Manifest-Version: 1.0\r\nCreated-By: respack\r\n\r\n";

/// Selects generated `R.java` sources, optionally rewriting their ids to static values.
pub struct SourceSelector {
    pub static_ids: bool,
}

impl EntrySelector for SourceSelector {
    fn select(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| name == "R.java")
    }

    fn transform(&self, _path: &Path, contents: Vec<u8>) -> Result<Vec<u8>> {
        if !self.static_ids {
            return Ok(contents);
        }
        let source = String::from_utf8_lossy(&contents);
        Ok(replace_ids_with_static_ids(&source).into_bytes())
    }
}

/// Selects compiled `.class` files.
pub struct ClassSelector;

impl EntrySelector for ClassSelector {
    fn select(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "class")
    }
}

/// Archives the generated sources under `source_dir` into `jar`.
pub fn create_src_jar(source_dir: &Path, jar: &Path, static_ids: bool) -> Result<Vec<ArchiveEntry>> {
    let mut builder = ArchiveBuilder::create(jar)?;
    builder.add_tree(source_dir, None, &SourceSelector { static_ids })?;
    let entries = builder.finish()?;
    info!("Packaged {} sources into {}", entries.len(), jar.display());
    Ok(entries)
}

/// Archives the class files under `class_dir` into `jar`, followed by a jar manifest.
pub fn create_class_jar(class_dir: &Path, jar: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut builder = ArchiveBuilder::create(jar)?;
    builder.add_tree(class_dir, None, &ClassSelector)?;
    builder.add_entry(MANIFEST_ENTRY, JAR_MANIFEST.as_bytes())?;
    let entries = builder.finish()?;
    info!("Packaged {} classes into {}", entries.len() - 1, jar.display());
    Ok(entries)
}

/// Archives merged resources under `res/` and assets under `assets/`.
pub fn create_resources_zip(
    resource_dir: Option<&Path>,
    asset_dir: Option<&Path>,
    output: &Path,
    uncompressed_extensions: &[String],
) -> Result<Vec<ArchiveEntry>> {
    let mut builder = ArchiveBuilder::create(output)?.with_stored_extensions(uncompressed_extensions);
    if let Some(dir) = resource_dir {
        builder.add_tree(dir, Some("res"), &AllFiles)?;
    }
    if let Some(dir) = asset_dir {
        builder.add_tree(dir, Some("assets"), &AllFiles)?;
    }
    let entries = builder.finish()?;
    info!("Packaged {} resource files into {}", entries.len(), output.display());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::static_ids::static_id;
    use std::fs::{self, File};
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn entry_text(jar: &Path, name: &str) -> String {
        let mut archive = ZipArchive::new(File::open(jar).unwrap()).unwrap();
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_src_jar_selects_r_java_only() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("com/app")).unwrap();
        fs::write(src.join("com/app/R.java"), "package com.app;\n").unwrap();
        fs::write(src.join("com/app/Manifest.java"), "package com.app;\n").unwrap();
        fs::write(src.join("com/app/R.txt"), "int id a 0x7f010000\n").unwrap();

        let jar = dir.path().join("out/r.srcjar");
        let entries = create_src_jar(&src, &jar, false).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "com/app/R.java");
    }

    #[test]
    fn test_src_jar_static_ids() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("p")).unwrap();
        fs::write(
            src.join("p/R.java"),
            "package p;\npublic final class R {\n    public static final class string {\n        public static int hello=0x7f020000;\n    }\n}\n",
        )
        .unwrap();

        let jar = dir.path().join("r.srcjar");
        create_src_jar(&src, &jar, true).unwrap();

        let text = entry_text(&jar, "p/R.java");
        let expected = format!("public static int hello=0x{:08X};", static_id("p", "string", "hello"));
        assert!(text.contains(&expected), "{text}");
        assert!(!text.contains("0x7f020000"));
    }

    #[test]
    fn test_src_jar_static_ids_tolerate_invalid_utf8() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("p")).unwrap();
        let mut source = b"package p;\n// caf\xE9\npublic final class R {\n".to_vec();
        source.extend_from_slice(
            b"    public static final class id {\n        public static int a=0x7f010000;\n    }\n}\n",
        );
        fs::write(src.join("p/R.java"), source).unwrap();

        let jar = dir.path().join("r.srcjar");
        create_src_jar(&src, &jar, true).unwrap();

        let text = entry_text(&jar, "p/R.java");
        assert!(text.contains(&format!("a=0x{:08X};", static_id("p", "id", "a"))));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_class_jar_appends_manifest_last() {
        let dir = tempdir().unwrap();
        let classes = dir.path().join("classes");
        fs::create_dir_all(classes.join("p")).unwrap();
        fs::write(classes.join("p/R.class"), [0xCA, 0xFE, 0xBA, 0xBE]).unwrap();
        fs::write(classes.join("p/R$id.class"), [0xCA, 0xFE, 0xBA, 0xBE]).unwrap();
        fs::write(classes.join("p/notes.txt"), "skip").unwrap();

        let jar = dir.path().join("r.jar");
        let entries = create_class_jar(&classes, &jar).unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["p/R$id.class", "p/R.class", MANIFEST_ENTRY]);
        assert_eq!(entry_text(&jar, MANIFEST_ENTRY), JAR_MANIFEST);
    }

    #[test]
    fn test_resources_zip_roots() {
        let dir = tempdir().unwrap();
        let res = dir.path().join("res");
        let assets = dir.path().join("assets");
        fs::create_dir_all(res.join("values")).unwrap();
        fs::create_dir_all(&assets).unwrap();
        fs::write(res.join("values/strings.xml"), "<resources/>").unwrap();
        fs::write(assets.join("data.bin"), [1, 2, 3]).unwrap();

        let out = dir.path().join("resources.zip");
        let entries = create_resources_zip(Some(&res), Some(&assets), &out, &[]).unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["res/values/strings.xml", "assets/data.bin"]);
    }
}
