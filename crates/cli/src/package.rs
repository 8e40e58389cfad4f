use respack_core::ResourceProcessor;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn rtxt(
    processor: &ResourceProcessor,
    generated: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    processor.copy_r_to_output(generated, output)?;
    info!("Wrote {}", output.display());
    Ok(())
}

pub fn srcjar(
    processor: &ResourceProcessor,
    generated: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = processor.create_src_jar(generated, output)?;
    info!("Wrote {} with {} sources", output.display(), entries.len());
    Ok(())
}

pub fn resources_zip(
    processor: &ResourceProcessor,
    resources: Option<PathBuf>,
    assets: Option<PathBuf>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries =
        processor.create_resources_zip(resources.as_deref(), assets.as_deref(), output)?;
    info!("Wrote {} with {} entries", output.display(), entries.len());
    Ok(())
}

pub fn manifest(
    processor: &ResourceProcessor,
    manifest: &Path,
    custom_package: Option<&str>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let written = processor.write_manifest_package(manifest, custom_package, output)?;
    if written == manifest {
        // No package override; the output is a plain copy of the input.
        let merged = respack_api::MergedData {
            resource_dir: PathBuf::new(),
            asset_dir: PathBuf::new(),
            manifest: manifest.to_path_buf(),
        };
        processor.copy_manifest_to_output(&merged, output)?;
    }
    println!("{}", output.display());
    Ok(())
}
