//! Entry point tying the packaging steps together.
//!
//! A [`ResourceProcessor`] runs after the external resource compiler: it copies and
//! canonicalizes the master symbol table, writes per-package symbol artifacts, archives
//! them reproducibly, reconciles split outputs and stamps every declared output.

use crate::archive::{self, ArchiveEntry};
use crate::config::ProcessorConfig;
use crate::error::{RespackError, Result};
use crate::manifest;
use crate::merge::{self, DataMerger, DirectoryModifier};
use crate::splits::find_and_rename_split_packages;
use crate::symbols::static_ids::flatten_hex_ids;
use crate::symbols::{
    ClassFileSink, JavaSourceSink, LoadedSymbols, PackageSymbolWriter, SymbolSink,
    SymbolTableLoader, default_threads,
};
use crate::util::{prepare_parent, stamp_epoch};
use rayon::ThreadPool;
use respack_api::{
    DependencyData, LibraryDescriptor, MergedData, OutputPaths, PrimaryData, SplitSpec,
    VariantType,
};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct ResourceProcessor {
    config: ProcessorConfig,
    /// Pool lent to merge collaborators. `None` once shut down.
    executor: Option<ThreadPool>,
}

impl ResourceProcessor {
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        let threads = config.worker_threads.unwrap_or_else(default_threads).max(1);
        let executor = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("respack-exec-{i}"))
            .build()
            .map_err(|e| RespackError::Pool(e.to_string()))?;
        Ok(Self {
            config,
            executor: Some(executor),
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn executor(&self) -> Result<&ThreadPool> {
        self.executor
            .as_ref()
            .ok_or_else(|| RespackError::Pool("processor has been shut down".to_string()))
    }

    /// Releases the collaborator pool. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.executor.take().is_some() {
            debug!("Resource processor executor shut down");
        }
    }

    fn loader(&self) -> SymbolTableLoader {
        match self.config.worker_threads {
            Some(threads) => SymbolTableLoader::with_threads(threads),
            None => SymbolTableLoader::new(),
        }
    }

    /// Copies `<generated_root>/R.txt` to `r_output`.
    ///
    /// With static ids every id is flattened to `0x1`. A missing table produces an empty
    /// output, since a project without resources still owes its consumers an `R.txt`.
    pub fn copy_r_to_output(&self, generated_root: &Path, r_output: &Path) -> Result<()> {
        prepare_parent(r_output)?;
        let source = generated_root.join("R.txt");
        if source.is_file() {
            if self.config.static_ids {
                let contents = fs::read_to_string(&source)?;
                fs::write(r_output, flatten_hex_ids(&contents))?;
            } else {
                fs::copy(&source, r_output)?;
            }
        } else {
            debug!("No R.txt under {}, writing an empty one", generated_root.display());
            File::create(r_output)?;
        }
        stamp_epoch(r_output)?;
        Ok(())
    }

    pub fn create_src_jar(
        &self,
        generated_root: &Path,
        src_jar: &Path,
    ) -> Result<Vec<ArchiveEntry>> {
        archive::create_src_jar(generated_root, src_jar, self.config.static_ids)
    }

    pub fn create_class_jar(
        &self,
        classes_root: &Path,
        class_jar: &Path,
    ) -> Result<Vec<ArchiveEntry>> {
        archive::create_class_jar(classes_root, class_jar)
    }

    pub fn copy_manifest_to_output(&self, merged: &MergedData, manifest_out: &Path) -> Result<()> {
        manifest::copy_manifest_to_output(&merged.manifest, manifest_out)
    }

    pub fn create_resources_zip(
        &self,
        resources_root: Option<&Path>,
        assets_root: Option<&Path>,
        output: &Path,
    ) -> Result<Vec<ArchiveEntry>> {
        archive::create_resources_zip(
            resources_root,
            assets_root,
            output,
            self.config.aapt.no_compress(),
        )
    }

    pub fn load_resource_symbol_table(
        &self,
        libraries: &[LibraryDescriptor],
        app_package: &str,
        primary_r_txt: &Path,
    ) -> Result<LoadedSymbols> {
        self.loader().load(libraries, app_package, primary_r_txt)
    }

    /// The package symbols are generated into: the custom package if set, otherwise the
    /// manifest's.
    pub fn app_package(&self, custom_package: Option<&str>, manifest: &Path) -> Result<String> {
        match custom_package.filter(|p| !p.is_empty()) {
            Some(package) => Ok(package.to_string()),
            None => manifest::manifest_package(manifest),
        }
    }

    fn write_symbols<S: SymbolSink>(
        &self,
        libraries: &[LibraryDescriptor],
        app_package: &str,
        primary_r_txt: &Path,
        sink: S,
    ) -> Result<Vec<PathBuf>> {
        let loaded = self.load_resource_symbol_table(libraries, app_package, primary_r_txt)?;
        let Some(master) = loaded.master else {
            warn!(
                "No master symbol table at {}, skipping symbol artifacts",
                primary_r_txt.display()
            );
            return Ok(Vec::new());
        };
        PackageSymbolWriter::new(&master, sink).write_all(&loaded.groups, app_package)
    }

    /// Writes `R.java` for every dependency package under `source_out`.
    ///
    /// Libraries get their ids at final link time, so nothing is written for them.
    pub fn write_dependency_package_sources(
        &self,
        variant: VariantType,
        dependencies: &[DependencyData],
        custom_package: Option<&str>,
        manifest: &Path,
        source_out: &Path,
    ) -> Result<Vec<PathBuf>> {
        if variant == VariantType::Library {
            debug!("Skipping dependency sources for a library");
            return Ok(Vec::new());
        }
        let app_package = self.app_package(custom_package, manifest)?;
        let libraries: Vec<_> = dependencies.iter().map(DependencyData::as_library).collect();
        self.write_symbols(
            &libraries,
            &app_package,
            &source_out.join("R.txt"),
            JavaSourceSink::new(source_out),
        )
    }

    /// Writes compiled R classes for every dependency package and the app package.
    pub fn write_package_classes(
        &self,
        libraries: &[LibraryDescriptor],
        app_package: &str,
        primary_r_txt: &Path,
        classes_out: &Path,
    ) -> Result<Vec<PathBuf>> {
        self.write_symbols(
            libraries,
            app_package,
            primary_r_txt,
            ClassFileSink::new(classes_out, self.config.final_fields),
        )
    }

    /// Stamps every declared output that exists and, when splits were requested, renames
    /// the split archives next to the package output. Returns the split paths.
    pub fn finish_outputs(
        &self,
        outputs: &OutputPaths,
        splits: &[SplitSpec],
    ) -> Result<Vec<PathBuf>> {
        for path in outputs.stamped_files() {
            if path.is_file() {
                stamp_epoch(path)?;
            } else {
                warn!("Declared output {} was not produced", path.display());
            }
        }

        let Some(package_out) = outputs.package_out.as_deref() else {
            return Ok(Vec::new());
        };
        if splits.is_empty() {
            return Ok(Vec::new());
        }
        let split_outputs = find_and_rename_split_packages(package_out, splits)?;
        for path in &split_outputs {
            stamp_epoch(path)?;
        }
        info!("Finished {} split outputs", split_outputs.len());
        Ok(split_outputs)
    }

    pub fn write_manifest_package(
        &self,
        manifest: &Path,
        custom_package: Option<&str>,
        output: &Path,
    ) -> Result<PathBuf> {
        manifest::write_manifest_package(manifest, custom_package, output)
    }

    /// Merges primary and dependency data on the collaborator pool.
    #[allow(clippy::too_many_arguments)]
    pub fn merge_data(
        &self,
        primary: &PrimaryData,
        dependencies: &[DependencyData],
        resources_out: &Path,
        assets_out: &Path,
        modifiers: &[Box<dyn DirectoryModifier>],
        merger: &dyn DataMerger,
        strict: bool,
    ) -> Result<MergedData> {
        self.executor()?.install(|| {
            merge::merge_data(
                primary,
                dependencies,
                resources_out,
                assets_out,
                modifiers,
                merger,
                strict,
            )
        })
    }
}

impl Drop for ResourceProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergeSets;
    use std::time::SystemTime;
    use tempfile::tempdir;

    fn processor(static_ids: bool) -> ResourceProcessor {
        ResourceProcessor::new(ProcessorConfig {
            static_ids,
            worker_threads: Some(1),
            ..Default::default()
        })
        .unwrap()
    }

    fn is_epoch(path: &Path) -> bool {
        fs::metadata(path).unwrap().modified().unwrap() == SystemTime::UNIX_EPOCH
    }

    #[test]
    fn test_copy_r_flattens_with_static_ids() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("R.txt"), "int string a 0x7f020000\n").unwrap();
        let out = dir.path().join("out/R.txt");

        processor(true).copy_r_to_output(dir.path(), &out).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "int string a 0x1\n");
        assert!(is_epoch(&out));
    }

    #[test]
    fn test_copy_r_without_table_writes_empty_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out/R.txt");

        processor(false)
            .copy_r_to_output(&dir.path().join("gen"), &out)
            .unwrap();

        assert_eq!(fs::read(&out).unwrap(), Vec::<u8>::new());
        assert!(is_epoch(&out));
    }

    #[test]
    fn test_library_variant_writes_no_sources() {
        let dir = tempdir().unwrap();
        let written = processor(false)
            .write_dependency_package_sources(
                VariantType::Library,
                &[],
                Some("com.app"),
                &dir.path().join("AndroidManifest.xml"),
                dir.path(),
            )
            .unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn test_app_package_prefers_custom() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("AndroidManifest.xml");
        fs::write(&manifest, r#"<manifest package="com.from.manifest"/>"#).unwrap();
        let processor = processor(false);

        let package = |custom| processor.app_package(custom, &manifest).unwrap();
        assert_eq!(package(Some("com.custom")), "com.custom");
        assert_eq!(package(Some("")), "com.from.manifest");
        assert_eq!(package(None), "com.from.manifest");
    }

    #[test]
    fn test_finish_outputs_stamps_declared_files() {
        let dir = tempdir().unwrap();
        let package_out = dir.path().join("app.ap_");
        let proguard_out = dir.path().join("proguard.cfg");
        fs::write(&package_out, "apk").unwrap();
        fs::write(&proguard_out, "-keep class *").unwrap();
        let outputs = OutputPaths {
            package_out: Some(package_out.clone()),
            proguard_out: Some(proguard_out.clone()),
            main_dex_proguard_out: Some(dir.path().join("missing.cfg")),
            ..Default::default()
        };

        let splits = processor(false).finish_outputs(&outputs, &[]).unwrap();

        assert!(splits.is_empty());
        assert!(is_epoch(&package_out));
        assert!(is_epoch(&proguard_out));
    }

    #[test]
    fn test_custom_manifest_package_output_is_stamped() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("AndroidManifest.xml");
        fs::write(&manifest, r#"<manifest package="a.b"/>"#).unwrap();
        let out = dir.path().join("out/AndroidManifest.xml");

        let written = processor(false)
            .write_manifest_package(&manifest, Some("c.d"), &out)
            .unwrap();

        assert_eq!(written, out);
        assert!(is_epoch(&out));
    }

    struct NoopMerger;

    impl DataMerger for NoopMerger {
        fn merge(&self, _: &MergeSets, _: &Path, _: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_merge_after_shutdown_fails() {
        let mut processor = processor(false);
        let primary = PrimaryData::default();
        let (res, assets) = (Path::new("res"), Path::new("assets"));
        let merged = processor
            .merge_data(&primary, &[], res, assets, &[], &NoopMerger, false)
            .unwrap();
        assert_eq!(merged.asset_dir, PathBuf::from("assets"));

        processor.shutdown();
        processor.shutdown();
        let err = processor
            .merge_data(&primary, &[], res, assets, &[], &NoopMerger, false)
            .unwrap_err();
        assert!(matches!(err, RespackError::Pool(_)));
    }
}
