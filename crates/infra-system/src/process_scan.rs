// Command-line search over the OS process table
use std::collections::BTreeMap;
use sysinfo::{ProcessStatus, System};
use tracing::debug;

use pipectl_core::domain::{CommandLinePattern, Pid};

/// Live processes whose command line contains `pattern`
///
/// Excludes the calling process and zombies. An entry whose parent matched
/// with the identical command line is a thread of that parent and is folded
/// into it.
pub(crate) fn find_matching(system: &mut System, pattern: &CommandLinePattern) -> Vec<Pid> {
    system.refresh_processes();
    let own = std::process::id();

    let matched: BTreeMap<u32, (Option<u32>, &[String])> = system
        .processes()
        .iter()
        .filter(|(pid, _)| pid.as_u32() != own)
        .filter(|(_, p)| p.status() != ProcessStatus::Zombie)
        .filter(|(_, p)| pattern.matches(p.cmd()))
        .map(|(pid, p)| (pid.as_u32(), (p.parent().map(|pp| pp.as_u32()), p.cmd())))
        .collect();

    let pids: Vec<Pid> = matched
        .iter()
        .filter(|(_, (parent, cmd))| {
            match parent.and_then(|pp| matched.get(&pp)) {
                Some((_, parent_cmd)) => parent_cmd != cmd,
                None => true,
            }
        })
        .filter_map(|(pid, _)| Pid::new(*pid).ok())
        .collect();

    debug!(pattern = %pattern, matches = ?pids, "Process table searched");
    pids
}
