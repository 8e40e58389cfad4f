use respack_api::{OutputPaths, SplitSpec};
use respack_core::ResourceProcessor;
use tracing::info;

pub fn run(
    processor: &ResourceProcessor,
    outputs: &OutputPaths,
    extra_splits: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut splits = processor.config().aapt.split_specs()?;
    for raw in extra_splits {
        splits.push(SplitSpec::parse(raw)?);
    }

    let split_outputs = processor.finish_outputs(outputs, &splits)?;
    for path in &split_outputs {
        info!("Split output: {}", path.display());
    }
    Ok(())
}
