//! Reading and stamping the `package` attribute of an Android manifest.

use crate::error::{RespackError, Result};
use crate::util::{prepare_parent, stamp_epoch};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

fn is_manifest_element(element: &BytesStart<'_>) -> bool {
    element.name().as_ref().eq_ignore_ascii_case(b"manifest")
}

/// Returns the `package` attribute of the manifest's root element.
pub fn manifest_package(manifest: &Path) -> Result<String> {
    let xml = fs::read_to_string(manifest)?;
    let mut reader = Reader::from_str(&xml);

    loop {
        match reader
            .read_event()
            .map_err(|e| RespackError::manifest(manifest, e))?
        {
            Event::Start(element) | Event::Empty(element) => {
                if !is_manifest_element(&element) {
                    return Err(RespackError::manifest(
                        manifest,
                        "root element is not <manifest>",
                    ));
                }
                for attr in element.attributes() {
                    let attr = attr.map_err(|e| RespackError::manifest(manifest, e))?;
                    if attr.key.as_ref() == b"package" {
                        let value = attr
                            .unescape_value()
                            .map_err(|e| RespackError::manifest(manifest, e))?;
                        return Ok(value.trim().to_string());
                    }
                }
                return Err(RespackError::manifest(
                    manifest,
                    "<manifest> has no package attribute",
                ));
            }
            Event::Eof => {
                return Err(RespackError::manifest(manifest, "no root element"));
            }
            _ => {}
        }
    }
}

fn with_package(
    element: &BytesStart<'_>,
    manifest: &Path,
    package: &str,
) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut stamped = BytesStart::new(name);
    for attr in element.attributes() {
        let attr = attr.map_err(|e| RespackError::manifest(manifest, e))?;
        if attr.key.as_ref().eq_ignore_ascii_case(b"package") {
            stamped.push_attribute(("package", package));
        } else {
            stamped.push_attribute(attr);
        }
    }
    Ok(stamped)
}

/// Writes a copy of `manifest` whose `<manifest package>` is `custom_package`.
///
/// Returns `manifest` itself when no custom package is given.
pub fn write_manifest_package(
    manifest: &Path,
    custom_package: Option<&str>,
    output: &Path,
) -> Result<PathBuf> {
    let Some(package) = custom_package.filter(|p| !p.is_empty()) else {
        return Ok(manifest.to_path_buf());
    };

    prepare_parent(output)?;
    let xml = fs::read_to_string(manifest)?;
    let mut reader = Reader::from_str(&xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        let event = reader
            .read_event()
            .map_err(|e| RespackError::manifest(manifest, e))?;
        let written = match event {
            Event::Eof => break,
            Event::Start(element) if is_manifest_element(&element) => {
                writer.write_event(Event::Start(with_package(&element, manifest, package)?))
            }
            Event::Empty(element) if is_manifest_element(&element) => {
                writer.write_event(Event::Empty(with_package(&element, manifest, package)?))
            }
            other => writer.write_event(other),
        };
        written.map_err(|e| RespackError::manifest(output, e))?;
    }

    fs::write(output, writer.into_inner())?;
    stamp_epoch(output)?;
    debug!("Stamped package {} into {}", package, output.display());
    Ok(output.to_path_buf())
}

/// Copies the merged manifest to its declared output.
pub fn copy_manifest_to_output(manifest: &Path, output: &Path) -> Result<()> {
    prepare_parent(output)?;
    fs::copy(manifest, output)?;
    stamp_epoch(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example.lib"
    android:versionCode="3">
    <application android:label="demo"/>
</manifest>
"#;

    #[test]
    fn test_manifest_package() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AndroidManifest.xml");
        fs::write(&path, MANIFEST).unwrap();

        assert_eq!(manifest_package(&path).unwrap(), "com.example.lib");
    }

    #[test]
    fn test_manifest_without_package_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AndroidManifest.xml");
        fs::write(&path, "<manifest/>").unwrap();

        let err = manifest_package(&path).unwrap_err();
        assert!(matches!(err, RespackError::Manifest { .. }));
    }

    #[test]
    fn test_write_manifest_package() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AndroidManifest.xml");
        let output = dir.path().join("out/AndroidManifest.xml");
        fs::write(&path, MANIFEST).unwrap();

        let written = write_manifest_package(&path, Some("com.example.custom"), &output).unwrap();
        assert_eq!(written, output);
        assert_eq!(manifest_package(&output).unwrap(), "com.example.custom");

        let rewritten = fs::read_to_string(&output).unwrap();
        assert!(rewritten.contains(r#"android:versionCode="3""#));
        assert!(rewritten.contains("<application"));

        let modified = fs::metadata(&output).unwrap().modified().unwrap();
        assert_eq!(modified, std::time::SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_write_manifest_package_without_custom_package() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AndroidManifest.xml");
        let output = dir.path().join("out.xml");
        fs::write(&path, MANIFEST).unwrap();

        assert_eq!(write_manifest_package(&path, None, &output).unwrap(), path);
        assert_eq!(write_manifest_package(&path, Some(""), &output).unwrap(), path);
        assert!(!output.exists());
    }
}
