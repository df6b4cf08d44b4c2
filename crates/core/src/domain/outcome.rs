// Command outcomes returned by the supervisor

use serde::Serialize;
use std::path::PathBuf;

use super::pid::Pid;

/// Result of `start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
    pub pid: Pid,
    pub log_path: PathBuf,
    /// Previously recorded instance that was still alive when this one started
    pub previous: Option<Pid>,
}

/// Result of `stop`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StopOutcome {
    /// Recorded process was signalled and the record removed
    Stopped { pid: Pid },
    /// No record; processes found by command line were signalled
    StoppedByMatch { pids: Vec<Pid> },
    /// Nothing to stop
    NotRunning,
}

impl StopOutcome {
    pub fn stopped_pids(&self) -> Vec<Pid> {
        match self {
            StopOutcome::Stopped { pid } => vec![*pid],
            StopOutcome::StoppedByMatch { pids } => pids.clone(),
            StopOutcome::NotRunning => Vec::new(),
        }
    }
}

/// How a running pipeline was located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningSource {
    Record,
    CommandLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessState {
    Running {
        pid: Pid,
        source: RunningSource,
    },
    NotRunning {
        /// Stale record removed while checking
        cleared_stale: Option<Pid>,
    },
}

/// Result of `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub state: ProcessState,
    /// Latest log lines mentioning a status keyword (oldest first)
    pub recent_activity: Vec<String>,
}

impl StatusReport {
    pub fn is_running(&self) -> bool {
        matches!(self.state, ProcessState::Running { .. })
    }

    pub fn pid(&self) -> Option<Pid> {
        match self.state {
            ProcessState::Running { pid, .. } => Some(pid),
            ProcessState::NotRunning { .. } => None,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of `restart`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestartOutcome {
    pub stopped: StopOutcome,
    pub started: StartOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json_shape() {
        let report = StatusReport {
            state: ProcessState::Running {
                pid: Pid::new(321).unwrap(),
                source: RunningSource::Record,
            },
            recent_activity: vec!["Job a completed successfully".to_string()],
        };

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["state"], "running");
        assert_eq!(value["pid"], 321);
        assert_eq!(value["source"], "record");
        assert_eq!(value["recent_activity"][0], "Job a completed successfully");
    }

    #[test]
    fn test_stopped_pids() {
        let a = Pid::new(1).unwrap();
        let b = Pid::new(2).unwrap();

        assert_eq!(StopOutcome::Stopped { pid: a }.stopped_pids(), vec![a]);
        assert_eq!(
            StopOutcome::StoppedByMatch { pids: vec![a, b] }.stopped_pids(),
            vec![a, b]
        );
        assert!(StopOutcome::NotRunning.stopped_pids().is_empty());
    }
}
