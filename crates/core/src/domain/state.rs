// Supervision state machine
//
// Absent --start--> TrackedLive --stop--> Absent
// TrackedLive --external death--> TrackedStale --status--> Absent

use serde::Serialize;

use super::pid::Pid;

/// Observable state of the record/process pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SupervisorState {
    /// No record
    Absent,
    /// Record present and the process is alive
    TrackedLive { pid: Pid },
    /// Record present but the process is gone
    TrackedStale { pid: Pid },
}

impl SupervisorState {
    /// Classify a loaded record using a liveness check
    pub fn observe(record: Option<Pid>, is_alive: impl FnOnce(Pid) -> bool) -> Self {
        match record {
            None => SupervisorState::Absent,
            Some(pid) if is_alive(pid) => SupervisorState::TrackedLive { pid },
            Some(pid) => SupervisorState::TrackedStale { pid },
        }
    }

    pub fn record(&self) -> Option<Pid> {
        match self {
            SupervisorState::Absent => None,
            SupervisorState::TrackedLive { pid } | SupervisorState::TrackedStale { pid } => {
                Some(*pid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe() {
        let pid = Pid::new(10).unwrap();

        assert_eq!(
            SupervisorState::observe(None, |_| true),
            SupervisorState::Absent
        );
        assert_eq!(
            SupervisorState::observe(Some(pid), |_| true),
            SupervisorState::TrackedLive { pid }
        );
        assert_eq!(
            SupervisorState::observe(Some(pid), |_| false),
            SupervisorState::TrackedStale { pid }
        );
    }

    #[test]
    fn test_absent_skips_liveness_check() {
        let state = SupervisorState::observe(None, |_| panic!("must not be called"));
        assert_eq!(state.record(), None);
    }
}
