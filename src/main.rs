use clap::{Parser, Subcommand};
use std::path::PathBuf;

use column_dropper::config::PipelineConfig;
use column_dropper::runtime;

#[derive(Parser)]
#[command(name = "coldrop")]
#[command(about = "Drop columns from Parquet datasets through a fit/transform pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline from YAML configuration
    Run {
        /// Path to pipeline YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a pipeline configuration and its operators
    Validate {
        /// Path to pipeline YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let pipeline = PipelineConfig::from_yaml_file(&config)?;
            runtime::run_pipeline(&pipeline)?;
        }
        Commands::Validate { config } => {
            let pipeline = PipelineConfig::from_yaml_file(&config)?;
            // Building each stage resolves operator names and checks their params
            for stage in &pipeline.stages {
                runtime::build_pipeline(stage)?;
            }
            println!("✓ Pipeline configuration is valid");
        }
        Commands::Version => {
            println!("coldrop version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
