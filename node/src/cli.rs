//! # CLI Interface
//!
//! Command-line argument structure for `verdant-node`, via `clap` derive.
//! Three subcommands: `run`, `status`, and `version`.

use clap::{Parser, Subcommand};

/// Verdant carbon credit ledger service.
///
/// Serves the carbon credit contract surface over HTTP: JSON-RPC for the
/// named contract calls, REST endpoints for reads, and Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "verdant-node",
    about = "Verdant carbon credit ledger service",
    version,
    propagate_version = true
)]
pub struct VerdantNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger service.
    Run(RunArgs),
    /// Query the status of a running service via its RPC endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The contract owner principal. Only this principal can mint credits
    /// and manage the verifier roster. Fixed for the life of the process.
    #[arg(long, env = "VERDANT_OWNER")]
    pub owner: String,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "VERDANT_RPC_PORT", default_value_t = verdant_ledger::config::DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VERDANT_METRICS_PORT", default_value_t = verdant_ledger::config::DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "VERDANT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Disable the cash faucet endpoint. The faucet funds payment accounts
    /// out of thin air, which is what you want on a dev instance and
    /// absolutely not what you want anywhere else.
    #[arg(long, env = "VERDANT_DISABLE_FAUCET")]
    pub disable_faucet: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// RPC endpoint of the running service.
    #[arg(long, default_value = "http://127.0.0.1:8430")]
    pub rpc_url: String,
}
