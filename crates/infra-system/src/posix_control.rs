// POSIX process control
// Signals via nix, command-line search via sysinfo
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid as NixPid;
use std::sync::{Mutex, PoisonError};
use sysinfo::{ProcessStatus, System};
use tracing::info;

use pipectl_core::domain::{CommandLinePattern, LaunchSpec, Pid};
use pipectl_core::port::process_control::{ProcessControl, ProcessError};

use crate::{process_scan, spawn};

/// Signal-based process control for unix hosts
pub struct PosixProcessControl {
    system: Mutex<System>,
}

impl PosixProcessControl {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// A zombie still answers signal 0 until its parent reaps it
    fn is_zombie(&self, pid: Pid) -> bool {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        let sys_pid = sysinfo::Pid::from_u32(pid.as_u32());

        system.refresh_process(sys_pid)
            && system
                .process(sys_pid)
                .is_some_and(|p| p.status() == ProcessStatus::Zombie)
    }
}

impl Default for PosixProcessControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessControl for PosixProcessControl {
    async fn spawn_detached(&self, spec: &LaunchSpec) -> Result<Pid, ProcessError> {
        spawn::spawn_detached(spec)
    }

    async fn terminate(&self, pid: Pid) -> Result<(), ProcessError> {
        info!(pid = %pid, "Sending SIGTERM");
        kill(NixPid::from_raw(pid.as_raw()), Signal::SIGTERM).map_err(|e| match e {
            Errno::ESRCH => ProcessError::NoSuchProcess(pid),
            other => ProcessError::SignalFailed {
                pid,
                reason: other.to_string(),
            },
        })
    }

    fn is_alive(&self, pid: Pid) -> bool {
        // Signal 0 checks existence; EPERM means it exists under another user
        let exists = match kill(NixPid::from_raw(pid.as_raw()), None::<Signal>) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        };
        exists && !self.is_zombie(pid)
    }

    fn find_matching(&self, pattern: &CommandLinePattern) -> Vec<Pid> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        process_scan::find_matching(&mut system, pattern)
    }
}
