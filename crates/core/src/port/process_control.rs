// Process Control Port
// Platform capability needed to supervise one external process

use crate::domain::{CommandLinePattern, LaunchSpec, Pid};
use async_trait::async_trait;
use thiserror::Error;

/// Process control errors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Signal to PID {pid} failed: {reason}")]
    SignalFailed { pid: Pid, reason: String },

    #[error("No such process: {0}")]
    NoSuchProcess(Pid),
}

/// Process Control trait
///
/// Implementations:
/// - PosixProcessControl: POSIX signals for liveness and termination
/// - ProcessTableControl: queries the OS process table for everything
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Start the program detached from the invoking terminal
    ///
    /// Combined stdout/stderr goes to `spec.log_path` (append, create).
    ///
    /// # Errors
    /// - ProcessError::SpawnFailed if the log cannot be opened or the program cannot be started
    async fn spawn_detached(&self, spec: &LaunchSpec) -> Result<Pid, ProcessError>;

    /// Request termination; does not wait for the process to exit
    ///
    /// # Errors
    /// - ProcessError::NoSuchProcess if nothing answers to `pid`
    /// - ProcessError::SignalFailed if delivery was refused
    async fn terminate(&self, pid: Pid) -> Result<(), ProcessError>;

    /// Check if a process is still alive
    fn is_alive(&self, pid: Pid) -> bool;

    /// All live processes whose command line contains the pattern, excluding the caller
    fn find_matching(&self, pattern: &CommandLinePattern) -> Vec<Pid>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockState {
        next_pid: u32,
        /// Live processes and their command lines
        live: BTreeMap<Pid, String>,
        spawned: Vec<LaunchSpec>,
        terminated: Vec<Pid>,
        spawn_failure: Option<String>,
        refuse_signals: bool,
    }

    /// In-memory process table
    pub struct MockProcessControl {
        state: Arc<Mutex<MockState>>,
    }

    impl MockProcessControl {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(MockState {
                    next_pid: 1000,
                    ..Default::default()
                })),
            }
        }

        /// Add a process that was not started through `spawn_detached`
        pub fn add_foreign_process(&self, command_line: impl Into<String>) -> Pid {
            let mut state = self.state.lock().unwrap();
            let pid = Self::allocate(&mut state);
            state.live.insert(pid, command_line.into());
            pid
        }

        /// Simulate a process dying without going through `terminate`
        pub fn kill_out_of_band(&self, pid: Pid) {
            self.state.lock().unwrap().live.remove(&pid);
        }

        pub fn fail_spawn(&self, message: impl Into<String>) {
            self.state.lock().unwrap().spawn_failure = Some(message.into());
        }

        /// Make every `terminate` fail with a permission error
        pub fn refuse_signals(&self) {
            self.state.lock().unwrap().refuse_signals = true;
        }

        pub fn spawned(&self) -> Vec<LaunchSpec> {
            self.state.lock().unwrap().spawned.clone()
        }

        pub fn terminated(&self) -> Vec<Pid> {
            self.state.lock().unwrap().terminated.clone()
        }

        pub fn live_count(&self) -> usize {
            self.state.lock().unwrap().live.len()
        }

        fn allocate(state: &mut MockState) -> Pid {
            state.next_pid += 1;
            Pid::new(state.next_pid).unwrap()
        }
    }

    impl Default for MockProcessControl {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ProcessControl for MockProcessControl {
        async fn spawn_detached(&self, spec: &LaunchSpec) -> Result<Pid, ProcessError> {
            let mut state = self.state.lock().unwrap();
            if let Some(message) = state.spawn_failure.clone() {
                return Err(ProcessError::SpawnFailed(message));
            }

            let pid = Self::allocate(&mut state);
            state.live.insert(pid, spec.command_line());
            state.spawned.push(spec.clone());
            Ok(pid)
        }

        async fn terminate(&self, pid: Pid) -> Result<(), ProcessError> {
            let mut state = self.state.lock().unwrap();
            state.terminated.push(pid);

            if state.refuse_signals {
                return Err(ProcessError::SignalFailed {
                    pid,
                    reason: "Operation not permitted".to_string(),
                });
            }

            match state.live.remove(&pid) {
                Some(_) => Ok(()),
                None => Err(ProcessError::NoSuchProcess(pid)),
            }
        }

        fn is_alive(&self, pid: Pid) -> bool {
            self.state.lock().unwrap().live.contains_key(&pid)
        }

        fn find_matching(&self, pattern: &CommandLinePattern) -> Vec<Pid> {
            self.state
                .lock()
                .unwrap()
                .live
                .iter()
                .filter(|(_, cmd)| pattern.matches(&[cmd.as_str()]))
                .map(|(pid, _)| *pid)
                .collect()
        }
    }
}
