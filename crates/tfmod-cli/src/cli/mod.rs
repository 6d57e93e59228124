//! CLI for tfmod.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tfmod_core::config::{self, TfmodConfig};

use commands::{run_completions, run_fetch, run_plan, run_scan, FetchArgs};

/// Top-level CLI for tfmod.
#[derive(Debug, Parser)]
#[command(name = "tfmod")]
#[command(about = "tfmod: discover and fetch the Terraform modules a source tree uses", long_about = None)]
pub struct Cli {
    /// Read configuration from FILE instead of ~/.config/tfmod/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List module references found under a directory.
    Scan {
        /// Root of the Terraform source tree.
        dir: PathBuf,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the fetch plan: distinct modules grouped into collision-free batches.
    Plan {
        /// Root of the Terraform source tree.
        dir: PathBuf,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Fetch every external module referenced under a directory.
    Fetch {
        /// Root of the Terraform source tree.
        dir: PathBuf,
        /// Fetch up to N modules concurrently within a batch (default: CPU count).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Scan and plan, but do not download anything.
        #[arg(long)]
        no_download: bool,
        /// Give up on a single module after SECS seconds.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Print a shell completion script.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<TfmodConfig> {
    let cfg = match path {
        Some(p) => config::load_from_path(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Scan { dir, json } => {
                let cfg = load_config(cli.config.as_ref())?;
                run_scan(&cfg, &dir, json)
            }
            CliCommand::Plan { dir, json } => {
                let cfg = load_config(cli.config.as_ref())?;
                run_plan(&cfg, &dir, json)
            }
            CliCommand::Fetch {
                dir,
                jobs,
                no_download,
                timeout,
            } => {
                let cfg = load_config(cli.config.as_ref())?;
                run_fetch(
                    cfg,
                    &dir,
                    FetchArgs {
                        jobs,
                        no_download,
                        timeout,
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests;
