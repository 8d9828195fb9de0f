//! Trafficwatch CLI
//!
//! Command-line interface for the zero-traffic monitor.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trafficwatch::config::{LogFormat, LoggingConfig};
use trafficwatch::{Config, Monitor};

/// Trafficwatch - alert when a zone stops receiving traffic
#[derive(Parser)]
#[command(name = "trafficwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "TRAFFICWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Analytics API token
    #[arg(long, global = true, env = "API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Zone identifier to monitor
    #[arg(long, global = true, env = "ZONE_TAG")]
    zone_tag: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single traffic check (for cron or an external scheduler)
    Check {
        /// Log the alert instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Check on a fixed interval until interrupted
    Watch {
        /// Log alerts instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// Override the configured interval (e.g. "15m")
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<std::time::Duration>,
    },

    /// Print the effective configuration with secrets redacted
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging, cli.verbose);

    let result = match cli.command {
        Commands::Check { dry_run } => run_check(&config, dry_run).await,
        Commands::Watch { dry_run, interval } => run_watch(&config, dry_run, interval).await,
        // Unvalidated, so broken values can be inspected
        Commands::Config => {
            println!("{config:#?}");
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = Config::load(cli.config.as_deref())?
        .with_overrides(cli.api_token.clone(), cli.zone_tag.clone());
    if !matches!(cli.command, Commands::Config) {
        config.validate()?;
    }
    Ok(config)
}

fn init_logging(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn run_check(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    let monitor = Monitor::from_config(config, dry_run)?;
    let outcome = monitor.check_now().await;
    info!(outcome = ?outcome, "Scheduled check complete");
    Ok(())
}

async fn run_watch(
    config: &Config,
    dry_run: bool,
    interval: Option<std::time::Duration>,
) -> anyhow::Result<()> {
    let every = interval.unwrap_or(config.schedule.interval);
    if every.is_zero() {
        anyhow::bail!("interval must be greater than zero");
    }

    let monitor = Monitor::from_config(config, dry_run)?;
    monitor
        .watch(every, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "trafficwatch", &mut io::stdout());
}
