// Human-readable command output
use colored::Colorize;
use std::path::Path;

use pipectl_core::domain::{
    ProcessState, RestartOutcome, RunningSource, StartOutcome, StatusReport, StopOutcome,
};

pub fn print_started(outcome: &StartOutcome) {
    if let Some(previous) = outcome.previous {
        println!(
            "{} Previous instance (PID: {}) was still running",
            "!".yellow().bold(),
            previous
        );
    }
    println!("{} Pipeline started (PID: {})", "✓".green().bold(), outcome.pid);
    println!("  {} {}", "Output:".bold(), outcome.log_path.display());
}

pub fn print_stopped(outcome: &StopOutcome) {
    match outcome {
        StopOutcome::Stopped { pid } => {
            println!("{} Pipeline stopped (PID: {})", "✓".green().bold(), pid);
        }
        StopOutcome::StoppedByMatch { pids } => {
            let list: Vec<String> = pids.iter().map(|p| p.to_string()).collect();
            println!(
                "{} Pipeline stopped (PID: {}, found by command line)",
                "✓".green().bold(),
                list.join(", ")
            );
        }
        StopOutcome::NotRunning => {
            println!("{} Pipeline is not running", "○".yellow());
        }
    }
}

pub fn print_status(report: &StatusReport) {
    match &report.state {
        ProcessState::Running { pid, source } => {
            let note = match source {
                RunningSource::Record => "",
                RunningSource::CommandLine => ", PID file missing",
            };
            println!(
                "{} Pipeline is running (PID: {}{})",
                "●".green().bold(),
                pid,
                note
            );
        }
        ProcessState::NotRunning {
            cleared_stale: Some(pid),
        } => {
            println!(
                "{} Pipeline is not running (removed stale PID file for PID {})",
                "○".yellow(),
                pid
            );
        }
        ProcessState::NotRunning {
            cleared_stale: None,
        } => {
            println!("{} Pipeline is not running", "○".yellow());
        }
    }

    if !report.recent_activity.is_empty() {
        println!();
        println!("{}", "Recent activity:".cyan().bold());
        for line in &report.recent_activity {
            println!("  {}", line);
        }
    }
}

pub fn print_restarted(outcome: &RestartOutcome) {
    print_stopped(&outcome.stopped);
    print_started(&outcome.started);
}

/// `tail`-style header printed when the followed file changes
pub fn print_file_header(path: &Path, first: bool) {
    if !first {
        println!();
    }
    println!("{}", format!("==> {} <==", path.display()).bold());
}
