// Process-table process control
// reason: sysinfo works on every platform, including hosts without POSIX signals
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use sysinfo::{ProcessStatus, Signal, System};
use tracing::info;

use pipectl_core::domain::{CommandLinePattern, LaunchSpec, Pid};
use pipectl_core::port::process_control::{ProcessControl, ProcessError};

use crate::{process_scan, spawn};

/// Process control that queries the OS process table for everything
pub struct ProcessTableControl {
    system: Mutex<System>,
}

impl ProcessTableControl {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn sys_pid(pid: Pid) -> sysinfo::Pid {
        sysinfo::Pid::from_u32(pid.as_u32())
    }
}

impl Default for ProcessTableControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessControl for ProcessTableControl {
    async fn spawn_detached(&self, spec: &LaunchSpec) -> Result<Pid, ProcessError> {
        spawn::spawn_detached(spec)
    }

    async fn terminate(&self, pid: Pid) -> Result<(), ProcessError> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        let sys_pid = Self::sys_pid(pid);

        if !system.refresh_process(sys_pid) {
            return Err(ProcessError::NoSuchProcess(pid));
        }
        let process = system
            .process(sys_pid)
            .ok_or(ProcessError::NoSuchProcess(pid))?;

        info!(pid = %pid, "Requesting termination through the process table");

        // Graceful where the platform supports it, hard kill otherwise (Windows)
        let delivered = match process.kill_with(Signal::Term) {
            Some(delivered) => delivered,
            None => process.kill(),
        };

        if delivered {
            Ok(())
        } else {
            Err(ProcessError::SignalFailed {
                pid,
                reason: "termination refused by the operating system".to_string(),
            })
        }
    }

    fn is_alive(&self, pid: Pid) -> bool {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        let sys_pid = Self::sys_pid(pid);

        system.refresh_process(sys_pid)
            && system
                .process(sys_pid)
                .is_some_and(|p| p.status() != ProcessStatus::Zombie)
    }

    fn find_matching(&self, pattern: &CommandLinePattern) -> Vec<Pid> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        process_scan::find_matching(&mut system, pattern)
    }
}
