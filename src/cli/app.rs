//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::compile;
use super::output::{Output, OutputFormat};
use crate::config::PassConfig;
use crate::logging;
use crate::pass::namespace::derive_namespace;

#[derive(Parser)]
#[command(name = "poolwire")]
#[command(author, version, about = "Wire cache pools into a dependency-injection container")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Pass configuration file (TOML)
    #[arg(long, short = 'c', global = true, env = "POOLWIRE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the cache pool pass and print the resulting container
    Compile {
        /// Container description (toml, yaml or json)
        file: PathBuf,

        /// Write the container as JSON to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// List cache pools with their resolved name, namespace and clearer
    Pools {
        /// Container description (toml, yaml or json)
        file: PathBuf,
    },

    /// Compute the namespace of a single pool
    Namespace {
        /// Pool name
        name: String,

        /// Namespace seed
        #[arg(long)]
        seed: String,

        /// Adapter class of the pool
        #[arg(long)]
        class: Option<String>,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let output = Output::new(cli.format);

    tracing::debug!("poolwire starting");

    match cli.command {
        Commands::Compile { file, output: out_file } => {
            let config = PassConfig::load(cli.config.as_deref())?;
            compile::compile(&output, config, &file, out_file.as_deref())?
        }

        Commands::Pools { file } => {
            let config = PassConfig::load(cli.config.as_deref())?;
            compile::pools(&output, config, &file)?
        }

        Commands::Namespace { name, seed, class } => {
            let namespace = derive_namespace(&seed, class.as_deref(), &name);
            if output.is_json() {
                output.data(&serde_json::json!({
                    "name": name,
                    "class": class,
                    "namespace": namespace,
                }));
            } else {
                output.success(&namespace);
            }
        }
    }

    tracing::debug!("command completed successfully");
    Ok(())
}
