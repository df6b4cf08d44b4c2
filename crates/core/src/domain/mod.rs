// Domain Layer - Supervision entities

pub mod error;
pub mod launch;
pub mod log;
pub mod outcome;
pub mod pid;
pub mod state;

// Re-exports
pub use error::DomainError;
pub use launch::{CommandLinePattern, LaunchSpec};
pub use log::{LogLine, LogPattern, StatusKeywords};
pub use outcome::{
    ProcessState, RestartOutcome, RunningSource, StartOutcome, StatusReport, StopOutcome,
};
pub use pid::Pid;
pub use state::SupervisorState;
