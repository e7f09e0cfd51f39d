//! CLI for the BDM background download manager.

mod commands;
mod control_socket;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use bdm_core::config;
use bdm_core::engine::Priority;

use commands::{
    run_cancel_all, run_get, run_pause, run_pause_all, run_resume, run_resume_all, GetOptions,
};

/// Top-level CLI for the BDM download manager.
#[derive(Debug, Parser)]
#[command(name = "bdm")]
#[command(about = "BDM: resumable background download manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Transfer priority as exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PriorityArg {
    #[default]
    Default,
    High,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Default => Priority::Default,
            PriorityArg::High => Priority::High,
            PriorityArg::Low => Priority::Low,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs as tracked transfers.
    Get {
        /// HTTP/HTTPS URLs to download.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Destination file name (single URL only; default: derived from the URL path).
        #[arg(long)]
        name: Option<String>,

        /// Transfer priority.
        #[arg(long, value_enum, default_value = "default")]
        priority: PriorityArg,

        /// Ask the engine to exempt these transfers from power-saving throttling.
        #[arg(long)]
        unconstrained: bool,

        /// Download directory (default: configured dir, then the current directory).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Also show Log-severity messages.
        #[arg(long)]
        verbose: bool,

        /// Delete the files created this session when the run ends.
        #[arg(long)]
        clear: bool,
    },

    /// Pause a transfer in a running `bdm get` session.
    Pause {
        /// Transfer identifier.
        id: String,
    },

    /// Pause every running transfer in an active session.
    PauseAll,

    /// Resume a paused transfer in a running `bdm get` session.
    Resume {
        /// Transfer identifier.
        id: String,
    },

    /// Resume every paused transfer in an active session.
    ResumeAll,

    /// Cancel every active transfer in a running `bdm get` session.
    CancelAll,
}

impl CliCommand {
    /// Parse `std::env::args` and run the resulting command.
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Get {
                urls,
                name,
                priority,
                unconstrained,
                dir,
                verbose,
                clear,
            } => {
                let cfg = config::load_or_init()?;
                run_get(
                    &cfg,
                    GetOptions {
                        urls,
                        name,
                        priority,
                        unconstrained,
                        dir,
                        verbose,
                        clear,
                    },
                )
                .await
            }
            CliCommand::Pause { id } => run_pause(&id).await,
            CliCommand::PauseAll => run_pause_all().await,
            CliCommand::Resume { id } => run_resume(&id).await,
            CliCommand::ResumeAll => run_resume_all().await,
            CliCommand::CancelAll => run_cancel_all().await,
        }
    }
}
