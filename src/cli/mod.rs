// src/cli/mod.rs — CLI definition (clap derive)

pub mod discover;
pub mod export;
pub mod progress;
pub mod run;
pub mod traces;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "flowing",
    about = "Cyclic task dispatch with an incentive ledger",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the controller loop against the registered workers
    Run(RunArgs),
    /// Query each registered worker's /identity endpoint
    Discover {
        /// Worker registry JSON file ({"id": "url", ...})
        #[arg(long)]
        agents: Option<String>,
    },
    /// Serve a demo worker
    Worker {
        /// Worker name reported by /identity and in responses
        #[arg(long, default_value = "AgentA")]
        name: String,
        #[arg(long, default_value = "5000")]
        port: u16,
        /// Starting balance; a negative balance rejects tasks
        #[arg(long, default_value = "10.0", allow_hyphen_values = true)]
        balance: f64,
    },
    /// List recorded traces, or show one
    Traces {
        /// Trace id to show
        id: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Number of cycles (overrides config)
    #[arg(short, long)]
    pub cycles: Option<u32>,

    /// Tasks generated per cycle (overrides config)
    #[arg(short, long)]
    pub tasks: Option<usize>,

    /// Seconds to wait between cycles (overrides config)
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Starting balance for every worker (overrides config)
    #[arg(long)]
    pub initial_balance: Option<f64>,

    /// Worker registry JSON file ({"id": "url", ...})
    #[arg(long)]
    pub agents: Option<String>,

    /// Report output path
    #[arg(long, default_value = "controller_report.json")]
    pub report: String,

    /// Report format (json, yaml)
    #[arg(long, default_value = "json")]
    pub format: String,

    /// Record a trace of assignments, dispatches and ledger entries
    #[arg(long)]
    pub trace: bool,

    /// Seed the task generator for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Suppress progress output (only emit final statistics)
    #[arg(long)]
    pub quiet: bool,
}
