//! pipectl - start, stop, inspect and tail the pipeline process
//!
//! Composition root: wires the system adapters into the core supervisor.

mod config;
mod logging;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use pipectl_core::application::constants::DEFAULT_TAIL_LINES;
use pipectl_core::application::{cancel_channel, LogFollower, Supervisor};
use pipectl_core::port::ProcessControl;
use pipectl_infra_system::{FileLogSource, PidFile, ProcessTableControl};

use crate::config::{Overrides, Settings};

#[derive(Parser)]
#[command(name = "pipectl")]
#[command(about = "Supervise the pipeline process", long_about = None)]
#[command(version, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory the pipeline runs in (holds the PID file and logs)
    #[arg(long, global = true, env = "PIPECTL_WORKDIR")]
    workdir: Option<PathBuf>,

    /// PID file location
    #[arg(long, global = true)]
    pid_file: Option<String>,

    /// Log directory
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Process control backend (default: posix on unix, process-table elsewhere)
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// More diagnostics on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the pipeline in the background
    Start,

    /// Stop the pipeline
    Stop,

    /// Show whether the pipeline is running
    Status {
        /// Print the status report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Follow the pipeline logs (Ctrl+C to exit)
    Log {
        /// Lines to show from the end of each file before following
        #[arg(short = 'n', long, default_value_t = DEFAULT_TAIL_LINES)]
        lines: usize,
    },

    /// Stop, wait briefly, then start
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// POSIX signals
    Posix,
    /// OS process table queries
    ProcessTable,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose);

    let workdir = match &cli.workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine working directory")?,
    };
    let settings = Settings::load(
        &workdir,
        &Overrides {
            pid_file: cli.pid_file.clone(),
            log_dir: cli.log_dir.clone(),
        },
    )?;
    debug!(workdir = %settings.workdir().display(), "pipectl v{}", pipectl_core::VERSION);

    match cli.command {
        Commands::Start => {
            let outcome = build_supervisor(&settings, cli.backend)?
                .start()
                .await
                .context("Failed to start pipeline")?;
            output::print_started(&outcome);
        }

        Commands::Stop => {
            let outcome = build_supervisor(&settings, cli.backend)?
                .stop()
                .await
                .context("Failed to stop pipeline")?;
            output::print_stopped(&outcome);
        }

        Commands::Status { json } => {
            let report = build_supervisor(&settings, cli.backend)?
                .status()
                .await
                .context("Failed to check pipeline status")?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                output::print_status(&report);
            }
        }

        Commands::Log { lines } => follow_logs(&settings, lines).await?,

        Commands::Restart => {
            let outcome = build_supervisor(&settings, cli.backend)?
                .restart()
                .await
                .context("Failed to restart pipeline")?;
            output::print_restarted(&outcome);
        }
    }

    Ok(())
}

fn build_supervisor(settings: &Settings, backend: Option<Backend>) -> Result<Supervisor> {
    let process = process_control(backend)?;
    let records = Arc::new(PidFile::new(settings.pid_file_path()));
    let logs = Arc::new(FileLogSource::new(settings.log_pattern()?, 0));

    Ok(Supervisor::new(
        process,
        records,
        logs,
        settings.launch_spec(),
        settings.supervisor_config(),
    ))
}

fn process_control(backend: Option<Backend>) -> Result<Arc<dyn ProcessControl>> {
    let backend = backend.unwrap_or(if cfg!(unix) {
        Backend::Posix
    } else {
        Backend::ProcessTable
    });
    debug!(backend = ?backend, "Selected process control backend");

    match backend {
        #[cfg(unix)]
        Backend::Posix => Ok(Arc::new(pipectl_infra_system::PosixProcessControl::new())),
        #[cfg(not(unix))]
        Backend::Posix => anyhow::bail!("The posix backend is only available on unix"),
        Backend::ProcessTable => Ok(Arc::new(ProcessTableControl::new())),
    }
}

/// Tail then follow every matching log file until Ctrl+C
async fn follow_logs(settings: &Settings, lines: usize) -> Result<()> {
    let source = FileLogSource::new(settings.log_pattern()?, lines);
    let initial_files = source
        .files()
        .with_context(|| format!("Failed to list {}", source.pattern().display()))?;
    if initial_files.is_empty() {
        warn!(pattern = %source.pattern().display(), "No log files yet, waiting");
    }

    let (handle, token) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let follower = LogFollower::new(Box::new(source), settings.poll_interval(), token);
    let mut stream = Box::pin(follower.into_stream());

    let mut seen: BTreeSet<PathBuf> = initial_files.into_iter().collect();
    let mut show_headers = seen.len() > 1;
    let mut current: Option<PathBuf> = None;

    while let Some(item) = stream.next().await {
        let line = match item {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read log files");
                continue;
            }
        };

        if seen.insert(line.file.clone()) && seen.len() > 1 {
            show_headers = true;
        }
        if current.as_ref() != Some(&line.file) {
            if show_headers {
                output::print_file_header(&line.file, current.is_none());
            }
            current = Some(line.file.clone());
        }
        println!("{}", line.text);
    }

    Ok(())
}
