use respack_api::{DependencyData, VariantType};
use respack_core::ResourceProcessor;
use std::path::Path;
use tracing::info;

pub fn sources(
    processor: &ResourceProcessor,
    manifest: &Path,
    custom_package: Option<&str>,
    dependencies: &[DependencyData],
    variant: VariantType,
    source_out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let written = processor.write_dependency_package_sources(
        variant,
        dependencies,
        custom_package,
        manifest,
        source_out,
    )?;
    info!("Wrote {} R sources under {}", written.len(), source_out.display());
    Ok(())
}

pub fn class_jar(
    processor: &ResourceProcessor,
    manifest: &Path,
    custom_package: Option<&str>,
    dependencies: &[DependencyData],
    r_txt: &Path,
    classes_out: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let app_package = processor.app_package(custom_package, manifest)?;
    let libraries: Vec<_> = dependencies.iter().map(DependencyData::as_library).collect();

    let classes = processor.write_package_classes(&libraries, &app_package, r_txt, classes_out)?;
    info!("Generated {} classes for {}", classes.len(), app_package);

    let entries = processor.create_class_jar(classes_out, output)?;
    info!("Wrote {} with {} entries", output.display(), entries.len());
    Ok(())
}
