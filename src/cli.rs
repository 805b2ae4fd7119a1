// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "refit")]
#[command(about = "Restarts containers onto freshly pulled images, dependencies first")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output for CI
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON lines output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a refit.yml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run one update pass against the local runtime
    Update {
        /// Classify only, no stop/start side effects
        #[arg(long)]
        no_restart: bool,

        /// Observe only, restart nothing
        #[arg(long)]
        monitor_only: bool,

        /// Stop and restart each container in turn
        #[arg(long)]
        rolling: bool,

        /// Remove replaced images afterwards
        #[arg(long)]
        cleanup: bool,

        /// Run lifecycle hook scripts
        #[arg(long)]
        hooks: bool,
    },

    /// Serve the HTTP trigger endpoint
    Serve {
        /// Bind address (overrides config)
        #[arg(short, long)]
        listen: Option<std::net::SocketAddr>,
    },
}
