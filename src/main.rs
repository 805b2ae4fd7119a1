// ABOUTME: Entry point for the refit CLI application.
// ABOUTME: Parses arguments and dispatches to the pass or the trigger endpoint.

mod cli;

use std::env;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use refit::config::{self, Config};
use refit::error::{Error, Result};
use refit::hooks::HookRunner;
use refit::output::{Output, OutputMode};
use refit::runtime::DockerClient;
use refit::trigger::{self, ApiState, TriggerGate, UpdateFn};
use refit::update;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Determine output mode
    let output_mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(output_mode);

    let result = run(cli, output).await;

    if let Err(e) = result {
        handle_error(e);
    }
}

/// Handle errors with programmatic error types and helpful hints.
fn handle_error(e: Error) -> ! {
    match &e {
        Error::AlreadyExists(path) => {
            eprintln!("Error: {} already exists", path.display());
            eprintln!("       Tip: Use --force to overwrite");
            std::process::exit(2);
        }
        Error::Client(client_err) => {
            eprintln!("Error: {client_err}");
            eprintln!("       Tip: Check the daemon socket in refit.yml");
            std::process::exit(3);
        }
        Error::Update(update_err) => {
            eprintln!("Error: {update_err}");
            std::process::exit(4);
        }
        _ => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, force)?;
            output.success("wrote refit.yml");
            Ok(())
        }
        Commands::Update {
            no_restart,
            monitor_only,
            rolling,
            cleanup,
            hooks,
        } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;

            // CLI flags tighten the configured defaults
            let mut params = config.to_params();
            params.no_restart |= no_restart;
            params.monitor_only |= monitor_only;
            params.rolling_restart |= rolling;
            params.cleanup |= cleanup;
            params.lifecycle_hooks |= hooks;

            let client = DockerClient::connect(&config.socket)?;
            let hook_runner = HookRunner::new(&cwd);

            output.progress("checking containers for updated images");
            let metric = update::update(&client, &hook_runner, &params).await?;
            output.metric(&metric);
            Ok(())
        }
        Commands::Serve { listen } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            let addr = listen.unwrap_or(config.listen);
            let params = config.to_params();

            let client = Arc::new(DockerClient::connect(&config.socket)?);
            let hook_runner = Arc::new(HookRunner::new(&cwd));

            let update_fn: UpdateFn = Arc::new(move |tags| {
                let client = client.clone();
                let hook_runner = hook_runner.clone();
                let params = params.clone();
                Box::pin(async move {
                    client.set_tag_overrides(tags);
                    match update::update(client.as_ref(), hook_runner.as_ref(), &params).await {
                        Ok(metric) => tracing::info!(
                            scanned = metric.scanned,
                            updated = metric.updated,
                            failed = metric.failed,
                            "update pass complete"
                        ),
                        Err(e) => tracing::error!(error = %e, "update pass failed"),
                    }
                })
            });

            let state = Arc::new(ApiState::new(TriggerGate::new(), update_fn));
            trigger::serve(addr, state).await?;
            Ok(())
        }
    }
}
