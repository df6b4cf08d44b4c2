// Detached spawn shared by both ProcessControl implementations
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use pipectl_core::domain::{LaunchSpec, Pid};
use pipectl_core::port::ProcessError;

/// Start `spec` in its own session with output appended to `spec.log_path`
///
/// The child outlives the caller. Must be called inside a tokio runtime,
/// which reaps the child if it exits while we are still running.
pub(crate) fn spawn_detached(spec: &LaunchSpec) -> Result<Pid, ProcessError> {
    if let Some(dir) = spec.log_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            ProcessError::SpawnFailed(format!(
                "cannot create log directory {}: {e}",
                dir.display()
            ))
        })?;
    }

    let stdout = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&spec.log_path)
        .map_err(|e| {
            ProcessError::SpawnFailed(format!(
                "cannot open log file {}: {e}",
                spec.log_path.display()
            ))
        })?;
    let stderr = stdout
        .try_clone()
        .map_err(|e| ProcessError::SpawnFailed(format!("cannot duplicate log handle: {e}")))?;

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(false);
    detach(&mut cmd);

    let child = cmd.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => ProcessError::SpawnFailed(format!(
            "program '{}' not found, make sure it is installed and on PATH",
            spec.program
        )),
        _ => ProcessError::SpawnFailed(e.to_string()),
    })?;

    let raw = child
        .id()
        .ok_or_else(|| ProcessError::SpawnFailed("process exited before reporting a PID".to_string()))?;
    let pid = Pid::new(raw).map_err(|e| ProcessError::SpawnFailed(e.to_string()))?;
    info!(pid = %pid, program = %spec.program, "Spawned detached process");

    reap_in_background(child, pid);
    Ok(pid)
}

/// New session: no controlling terminal, no SIGHUP when the shell exits
#[cfg(unix)]
fn detach(cmd: &mut Command) {
    // SAFETY: setsid(2) is async-signal-safe and only affects the child
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid()?;
            Ok(())
        });
    }
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}

/// Wait on the child while the runtime lives
///
/// A child still running at runtime shutdown is dropped without being killed
/// and tokio reaps it on a best-effort basis.
fn reap_in_background(mut child: Child, pid: Pid) {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(pid = %pid, status = %status, "Detached process exited"),
            Err(e) => debug!(pid = %pid, error = %e, "Could not wait on detached process"),
        }
    });
}
