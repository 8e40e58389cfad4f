mod finish;
mod package;
mod symbols;

use clap::{Parser, Subcommand};
use respack_api::{DependencyData, VariantType};
use respack_core::{ProcessorConfig, ResourceProcessor};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "respack",
    version,
    about = "Deterministic packaging of compiled Android resources",
    long_about = "Respack runs after the resource compiler. It merges library symbol tables into \
                  per-package R sources and classes, builds byte-reproducible archives and \
                  reconciles split outputs with the requested split configurations."
)]
pub struct Cli {
    /// JSON processor configuration
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy the generated R.txt to its output, flattening ids with static ids enabled
    Rtxt {
        /// Directory holding the compiler's R.txt
        #[arg(value_name = "GENERATED_DIR")]
        generated: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
    /// Archive generated R.java sources
    Srcjar {
        #[arg(value_name = "GENERATED_DIR")]
        generated: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
    /// Write R.java for every dependency package into the source output
    Symbols {
        #[arg(long, value_name = "MANIFEST")]
        manifest: PathBuf,
        #[arg(long)]
        custom_package: Option<String>,
        /// `res#res:assets#assets:manifest[:R.txt]`, repeatable
        #[arg(long = "dependency", value_name = "DEPENDENCY")]
        dependencies: Vec<DependencyData>,
        #[arg(long, default_value = "default", value_parser = parse_variant)]
        variant: VariantType,
        /// Directory holding the master R.txt; sources are written here
        #[arg(long, value_name = "DIR")]
        source_out: PathBuf,
    },
    /// Generate R classes for the app and its dependencies and archive them
    Classjar {
        #[arg(long, value_name = "MANIFEST")]
        manifest: PathBuf,
        #[arg(long)]
        custom_package: Option<String>,
        #[arg(long = "dependency", value_name = "DEPENDENCY")]
        dependencies: Vec<DependencyData>,
        /// The master R.txt
        #[arg(long, value_name = "FILE")]
        r_txt: PathBuf,
        #[arg(long, value_name = "DIR")]
        classes_out: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
    /// Zip merged resources under res/ and assets under assets/
    ResourcesZip {
        #[arg(long, value_name = "DIR")]
        resources: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        assets: Option<PathBuf>,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
    /// Copy a manifest, optionally replacing its package
    Manifest {
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
        #[arg(long)]
        custom_package: Option<String>,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
    /// Stamp declared outputs and rename split archives
    Finish {
        #[arg(long, value_name = "FILE")]
        package_out: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        proguard_out: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        main_dex_proguard_out: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        public_resources_out: Option<PathBuf>,
        /// Requested split, e.g. `en-television,en-xxhdpi`; adds to the configured splits
        #[arg(long = "split", value_name = "SPLIT")]
        splits: Vec<String>,
    },
}

impl Commands {
    /// Subcommand name, also used to name its log file.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Rtxt { .. } => "rtxt",
            Commands::Srcjar { .. } => "srcjar",
            Commands::Symbols { .. } => "symbols",
            Commands::Classjar { .. } => "classjar",
            Commands::ResourcesZip { .. } => "resources-zip",
            Commands::Manifest { .. } => "manifest",
            Commands::Finish { .. } => "finish",
        }
    }
}

fn parse_variant(raw: &str) -> Result<VariantType, String> {
    match raw {
        "default" => Ok(VariantType::Default),
        "library" => Ok(VariantType::Library),
        "test" => Ok(VariantType::Test),
        other => Err(format!("unknown variant `{other}`")),
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let _guard = respack_core::logging::init_logging(cli.command.name(), cli.verbose);

    let config = match &cli.config {
        Some(path) => ProcessorConfig::from_file(path)?,
        None => ProcessorConfig::default(),
    };
    let mut processor = ResourceProcessor::new(config)?;

    let result = match cli.command {
        Commands::Rtxt { generated, output } => package::rtxt(&processor, &generated, &output),
        Commands::Srcjar { generated, output } => package::srcjar(&processor, &generated, &output),
        Commands::ResourcesZip {
            resources,
            assets,
            output,
        } => package::resources_zip(&processor, resources, assets, &output),
        Commands::Manifest {
            manifest,
            custom_package,
            output,
        } => package::manifest(&processor, &manifest, custom_package.as_deref(), &output),
        Commands::Symbols {
            manifest,
            custom_package,
            dependencies,
            variant,
            source_out,
        } => symbols::sources(
            &processor,
            &manifest,
            custom_package.as_deref(),
            &dependencies,
            variant,
            &source_out,
        ),
        Commands::Classjar {
            manifest,
            custom_package,
            dependencies,
            r_txt,
            classes_out,
            output,
        } => symbols::class_jar(
            &processor,
            &manifest,
            custom_package.as_deref(),
            &dependencies,
            &r_txt,
            &classes_out,
            &output,
        ),
        Commands::Finish {
            package_out,
            proguard_out,
            main_dex_proguard_out,
            public_resources_out,
            splits,
        } => {
            let outputs = respack_api::OutputPaths {
                package_out,
                proguard_out,
                main_dex_proguard_out,
                public_resources_out,
            };
            finish::run(&processor, &outputs, &splits)
        }
    };

    processor.shutdown();
    result
}
