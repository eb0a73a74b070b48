use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kiln::Options;

/// Index a schema registry: read the configuration, register every
/// collection's schemas, and materialise all derived artifacts.
#[derive(Debug, Parser)]
#[command(name = "kiln", version, about)]
struct Arguments {
    /// The registry configuration file (JSON or YAML).
    configuration: PathBuf,

    /// The output directory the artifacts are written to.
    output: PathBuf,

    /// The directory holding `@name` collection presets; defaults to the
    /// configuration file's directory.
    #[arg(long)]
    collections: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let arguments = Arguments::parse();
    let collections = match &arguments.collections {
        Some(collections) => collections.clone(),
        None => arguments
            .configuration
            .canonicalize()
            .with_context(|| {
                format!(
                    "cannot open configuration \"{}\"",
                    arguments.configuration.display()
                )
            })?
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/")),
    };
    let options = Options {
        configuration: arguments.configuration,
        output: arguments.output,
        collections,
    };
    kiln::run(&options)?;
    Ok(())
}
