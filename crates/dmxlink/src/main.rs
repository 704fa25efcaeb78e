//! dmxlink - keep a connection to the DMX daemon and move frames through it.
//!
//! Thin front end over `dmxlink-core`: every command builds a connection
//! manager for the configured socket and drives it until done.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dmxlink_core::{config, ManagerConfig, RetryPolicy, SocketConfig, SocketSessionFactory};

mod commands;
mod output;

/// Connection manager for a DMX lighting daemon.
#[derive(Parser, Debug)]
#[command(name = "dmxlink")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Daemon socket path (default: $DMXLINK_SOCKET or ~/.dmxlink/daemon.sock)
    #[arg(long, global = true)]
    socket: Option<String>,

    /// Retry interval in milliseconds while the daemon is unreachable
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    retry_ms: Option<u64>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and print received frames until Enter is pressed
    Monitor {
        /// Universe to watch (repeatable; default: every universe seen)
        #[arg(short, long = "universe")]
        universes: Vec<u32>,

        /// Polling interval in milliseconds
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },

    /// Send a single frame once the daemon is reachable
    Send {
        /// Target universe
        #[arg(short, long)]
        universe: u32,

        /// Comma-separated channel values, e.g. 255,100,0,5
        #[arg(long, value_delimiter = ',', required = true)]
        values: Vec<u8>,

        /// Give up if the daemon is not reachable within this many seconds
        #[arg(long, default_value_t = 5.0)]
        wait_secs: f64,
    },

    /// Check whether the daemon is reachable
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let out = output::OutputControls { pretty: cli.pretty };

    let mut socket = SocketConfig::from_env();
    if let Some(raw) = &cli.socket {
        socket.path = config::expand_path(raw);
    }
    let factory = SocketSessionFactory::new(socket);

    let mut manager_config = ManagerConfig::from_env().context("Invalid environment")?;
    if let Some(ms) = cli.retry_ms {
        manager_config.retry = RetryPolicy::fixed(Duration::from_millis(ms));
    }

    match cli.command {
        Command::Monitor {
            universes,
            interval_ms,
        } => commands::monitor::run(
            factory,
            manager_config,
            &universes,
            Duration::from_millis(interval_ms.max(1)),
            &out,
        ),
        Command::Send {
            universe,
            values,
            wait_secs,
        } => {
            let wait = Duration::try_from_secs_f64(wait_secs.max(0.0))
                .context("Invalid --wait-secs")?;
            commands::send::run(factory, manager_config, universe, &values, wait, &out)
        }
        Command::Status => commands::status::run(&factory, &out),
    }
}
