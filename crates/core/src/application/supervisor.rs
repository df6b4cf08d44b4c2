// Process Supervisor
// start / stop / status / restart over one PID record and one external process

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::application::constants::{DEFAULT_SETTLE_DELAY, DEFAULT_SUMMARY_LINES};
use crate::application::summary;
use crate::domain::{
    CommandLinePattern, LaunchSpec, Pid, ProcessState, RestartOutcome, RunningSource,
    StartOutcome, StatusKeywords, StatusReport, StopOutcome, SupervisorState,
};
use crate::error::Result;
use crate::port::{LogSource, ProcessControl, RecordError, RecordStore};

/// Supervisor tunables
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Pause between stop and start during restart
    pub settle_delay: Duration,
    /// Max keyword lines in the status summary
    pub summary_lines: usize,
    pub keywords: StatusKeywords,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            summary_lines: DEFAULT_SUMMARY_LINES,
            keywords: StatusKeywords::default(),
        }
    }
}

/// Process supervisor
///
/// Stateless between invocations: everything it knows comes from the
/// record store and the process table.
pub struct Supervisor {
    process: Arc<dyn ProcessControl>,
    records: Arc<dyn RecordStore>,
    logs: Arc<dyn LogSource>,
    launch: LaunchSpec,
    pattern: CommandLinePattern,
    config: SupervisorConfig,
}

impl Supervisor {
    /// Create a new supervisor
    ///
    /// # Arguments
    /// * `process` - Platform process control
    /// * `records` - Supervision Record store
    /// * `logs` - Log source used for the status summary
    /// * `launch` - How to start the pipeline (also yields the match pattern)
    /// * `config` - Delays and summary settings
    ///
    /// # Example
    /// ```ignore
    /// let supervisor = Supervisor::new(
    ///     Arc::new(PosixProcessControl::new()),
    ///     Arc::new(PidFile::new("pipeline.pid")),
    ///     Arc::new(FileLogSource::new(pattern, 10)),
    ///     launch,
    ///     SupervisorConfig::default(),
    /// );
    /// ```
    pub fn new(
        process: Arc<dyn ProcessControl>,
        records: Arc<dyn RecordStore>,
        logs: Arc<dyn LogSource>,
        launch: LaunchSpec,
        config: SupervisorConfig,
    ) -> Self {
        let pattern = launch.pattern();
        Self {
            process,
            records,
            logs,
            launch,
            pattern,
            config,
        }
    }

    pub fn launch_spec(&self) -> &LaunchSpec {
        &self.launch
    }

    /// Launch the pipeline and record its PID
    ///
    /// Does not refuse to start when a tracked instance is still alive.
    pub async fn start(&self) -> Result<StartOutcome> {
        let previous = match self.records.load() {
            Ok(Some(pid)) if self.process.is_alive(pid) => {
                warn!(
                    pid = %pid,
                    "Recorded pipeline is still running, starting another instance"
                );
                Some(pid)
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable record before start");
                None
            }
        };

        info!(
            command = %self.launch.command_line(),
            working_dir = %self.launch.working_dir.display(),
            log_path = %self.launch.log_path.display(),
            "Starting pipeline"
        );

        let pid = self.process.spawn_detached(&self.launch).await?;
        self.records.save(pid)?;

        info!(pid = %pid, "Pipeline started");

        Ok(StartOutcome {
            pid,
            log_path: self.launch.log_path.clone(),
            previous,
        })
    }

    /// Signal the pipeline and drop the record
    ///
    /// Signal failures are logged, never returned. After success no record exists.
    pub async fn stop(&self) -> Result<StopOutcome> {
        if let Some(pid) = self.load_record()? {
            self.terminate_quietly(pid).await;
            self.records.delete()?;

            info!(pid = %pid, "Pipeline stopped, record removed");
            return Ok(StopOutcome::Stopped { pid });
        }

        let pids = self.process.find_matching(&self.pattern);
        if pids.is_empty() {
            info!(pattern = %self.pattern, "No record and no matching process");
            return Ok(StopOutcome::NotRunning);
        }

        for pid in &pids {
            self.terminate_quietly(*pid).await;
        }

        info!(pids = ?pids, pattern = %self.pattern, "Stopped processes found by command line");
        Ok(StopOutcome::StoppedByMatch { pids })
    }

    /// Report whether the pipeline runs
    ///
    /// Only side effect: a stale or corrupt record is deleted.
    pub async fn status(&self) -> Result<StatusReport> {
        let record = self.load_record()?;
        let state = SupervisorState::observe(record, |pid| self.process.is_alive(pid));

        let report = match state {
            SupervisorState::TrackedLive { pid } => StatusReport {
                state: ProcessState::Running {
                    pid,
                    source: RunningSource::Record,
                },
                recent_activity: self.recent_activity(),
            },
            SupervisorState::TrackedStale { pid } => {
                self.records.delete()?;
                info!(pid = %pid, "Removed stale record");

                StatusReport {
                    state: ProcessState::NotRunning {
                        cleared_stale: Some(pid),
                    },
                    recent_activity: Vec::new(),
                }
            }
            SupervisorState::Absent => {
                let state = match self.process.find_matching(&self.pattern).first() {
                    Some(pid) => {
                        debug!(pid = %pid, "Found pipeline by command line, record missing");
                        ProcessState::Running {
                            pid: *pid,
                            source: RunningSource::CommandLine,
                        }
                    }
                    None => ProcessState::NotRunning {
                        cleared_stale: None,
                    },
                };

                StatusReport {
                    state,
                    recent_activity: Vec::new(),
                }
            }
        };

        Ok(report)
    }

    /// stop, settle, start
    pub async fn restart(&self) -> Result<RestartOutcome> {
        let stopped = self.stop().await?;

        debug!(delay_ms = %self.config.settle_delay.as_millis(), "Waiting before start");
        tokio::time::sleep(self.config.settle_delay).await;

        let started = self.start().await?;
        Ok(RestartOutcome { stopped, started })
    }

    /// Load the record, deleting it when corrupt
    fn load_record(&self) -> Result<Option<Pid>> {
        match self.records.load() {
            Ok(pid) => Ok(pid),
            Err(RecordError::Corrupt { content }) => {
                warn!(content = %content, "Record does not hold a PID, discarding it");
                self.records.delete()?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn terminate_quietly(&self, pid: Pid) {
        if let Err(e) = self.process.terminate(pid).await {
            warn!(pid = %pid, error = %e, "Termination signal not delivered");
        }
    }

    fn recent_activity(&self) -> Vec<String> {
        match summary::recent_activity(
            self.logs.as_ref(),
            &self.config.keywords,
            self.config.summary_lines,
        ) {
            Ok(lines) => lines,
            Err(e) => {
                debug!(error = %e, "Log summary unavailable");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogLine;
    use crate::port::log_source::mocks::{BrokenLogSource, ScriptedLogSource};
    use crate::port::process_control::mocks::MockProcessControl;
    use crate::port::record_store::mocks::MemoryRecordStore;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        process: Arc<MockProcessControl>,
        records: Arc<MemoryRecordStore>,
        supervisor: Supervisor,
    }

    fn fixture_with(records: MemoryRecordStore, logs: Arc<dyn LogSource>) -> Fixture {
        let process = Arc::new(MockProcessControl::new());
        let records = Arc::new(records);
        let launch = LaunchSpec::new(
            "python",
            vec!["main.py".to_string()],
            "/srv/orca",
            "/srv/orca/logs/pipeline_output.log",
        );
        let supervisor = Supervisor::new(
            process.clone(),
            records.clone(),
            logs,
            launch,
            SupervisorConfig {
                settle_delay: Duration::ZERO,
                ..Default::default()
            },
        );
        Fixture {
            process,
            records,
            supervisor,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            MemoryRecordStore::new(),
            Arc::new(ScriptedLogSource::new(vec![vec![
                LogLine::new("pipeline_1.log", "Pipeline started successfully"),
                LogLine::new("pipeline_1.log", "Processing 1 queued jobs"),
                LogLine::new("pipeline_1.log", "Job h2o completed successfully"),
            ]])),
        )
    }

    #[tokio::test]
    async fn test_start_records_spawned_pid() {
        let f = fixture();

        let outcome = f.supervisor.start().await.unwrap();

        assert_eq!(f.records.load().unwrap(), Some(outcome.pid));
        assert!(f.process.is_alive(outcome.pid));
        assert_eq!(outcome.previous, None);
        assert_eq!(f.process.spawned().len(), 1);
        assert_eq!(f.process.spawned()[0].command_line(), "python main.py");
    }

    #[tokio::test]
    async fn test_start_then_status_reports_running() {
        let f = fixture();
        let started = f.supervisor.start().await.unwrap();

        let report = f.supervisor.status().await.unwrap();

        assert!(report.is_running());
        assert_eq!(report.pid(), Some(started.pid));
        assert_eq!(
            report.state,
            ProcessState::Running {
                pid: started.pid,
                source: RunningSource::Record
            }
        );
        assert_eq!(
            report.recent_activity,
            vec![
                "Processing 1 queued jobs".to_string(),
                "Job h2o completed successfully".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_double_start_is_allowed_but_noted() {
        let f = fixture();
        let first = f.supervisor.start().await.unwrap();

        let second = f.supervisor.start().await.unwrap();

        assert_ne!(first.pid, second.pid);
        assert_eq!(second.previous, Some(first.pid));
        assert_eq!(f.records.load().unwrap(), Some(second.pid));
        assert_eq!(f.process.live_count(), 2);
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_no_record() {
        let f = fixture();
        f.process.fail_spawn("python: not found");

        assert_err!(f.supervisor.start().await);
        assert_eq!(f.records.raw(), None);
    }

    #[tokio::test]
    async fn test_stop_removes_record() {
        let f = fixture();
        let started = f.supervisor.start().await.unwrap();

        let outcome = f.supervisor.stop().await.unwrap();

        assert_eq!(outcome, StopOutcome::Stopped { pid: started.pid });
        assert_eq!(f.records.raw(), None);
        assert!(!f.process.is_alive(started.pid));
    }

    #[tokio::test]
    async fn test_stop_removes_record_even_when_signal_fails() {
        let f = fixture();
        let started = f.supervisor.start().await.unwrap();
        f.process.refuse_signals();

        let outcome = assert_ok!(f.supervisor.stop().await);

        assert_eq!(outcome, StopOutcome::Stopped { pid: started.pid });
        assert_eq!(f.records.raw(), None);
    }

    #[tokio::test]
    async fn test_stop_with_stale_record_still_clears_it() {
        let f = fixture();
        let started = f.supervisor.start().await.unwrap();
        f.process.kill_out_of_band(started.pid);

        let outcome = assert_ok!(f.supervisor.stop().await);

        assert_eq!(outcome, StopOutcome::Stopped { pid: started.pid });
        assert_eq!(f.records.raw(), None);
    }

    #[tokio::test]
    async fn test_stop_without_record_falls_back_to_command_line() {
        let f = fixture();
        let orphan = f.process.add_foreign_process("/usr/bin/python main.py");
        let unrelated = f.process.add_foreign_process("python other.py");

        let outcome = f.supervisor.stop().await.unwrap();

        assert_eq!(outcome, StopOutcome::StoppedByMatch { pids: vec![orphan] });
        assert!(!f.process.is_alive(orphan));
        assert!(f.process.is_alive(unrelated));
    }

    #[tokio::test]
    async fn test_stop_when_nothing_runs_is_harmless() {
        let f = fixture();

        let outcome = f.supervisor.stop().await.unwrap();

        assert_eq!(outcome, StopOutcome::NotRunning);
        assert_eq!(f.records.mutations(), 0);
        assert!(f.process.terminated().is_empty());
    }

    #[tokio::test]
    async fn test_status_clears_stale_record() {
        let f = fixture();
        let started = f.supervisor.start().await.unwrap();
        f.process.kill_out_of_band(started.pid);

        let first = f.supervisor.status().await.unwrap();
        assert_eq!(
            first.state,
            ProcessState::NotRunning {
                cleared_stale: Some(started.pid)
            }
        );
        assert_eq!(f.records.raw(), None);

        let second = f.supervisor.status().await.unwrap();
        assert_eq!(
            second.state,
            ProcessState::NotRunning {
                cleared_stale: None
            }
        );
    }

    #[tokio::test]
    async fn test_status_without_record_finds_by_command_line() {
        let f = fixture();
        let orphan = f.process.add_foreign_process("python main.py");

        let report = f.supervisor.status().await.unwrap();

        assert_eq!(
            report.state,
            ProcessState::Running {
                pid: orphan,
                source: RunningSource::CommandLine
            }
        );
        assert_eq!(f.records.mutations(), 0);
        assert!(f.process.terminated().is_empty());
    }

    #[tokio::test]
    async fn test_status_is_read_only_while_running() {
        let f = fixture();
        f.supervisor.start().await.unwrap();
        let mutations = f.records.mutations();

        f.supervisor.status().await.unwrap();
        f.supervisor.status().await.unwrap();

        assert_eq!(f.records.mutations(), mutations);
    }

    #[tokio::test]
    async fn test_status_survives_unreadable_logs() {
        let f = fixture_with(MemoryRecordStore::new(), Arc::new(BrokenLogSource));
        f.supervisor.start().await.unwrap();

        let report = f.supervisor.status().await.unwrap();

        assert!(report.is_running());
        assert!(report.recent_activity.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_discarded() {
        let f = fixture_with(
            MemoryRecordStore::with_content("not-a-pid"),
            Arc::new(ScriptedLogSource::new(vec![])),
        );

        let report = f.supervisor.status().await.unwrap();

        assert!(!report.is_running());
        assert_eq!(f.records.raw(), None);
    }

    #[tokio::test]
    async fn test_restart_replaces_process() {
        let f = fixture();
        let before = f.supervisor.start().await.unwrap();

        let outcome = f.supervisor.restart().await.unwrap();

        assert_eq!(outcome.stopped, StopOutcome::Stopped { pid: before.pid });
        assert_ne!(outcome.started.pid, before.pid);
        assert_eq!(outcome.started.previous, None);
        assert_eq!(f.records.load().unwrap(), Some(outcome.started.pid));
        assert_eq!(f.process.live_count(), 1);
    }

    #[tokio::test]
    async fn test_restart_from_cold_just_starts() {
        let f = fixture();

        let outcome = f.supervisor.restart().await.unwrap();

        assert_eq!(outcome.stopped, StopOutcome::NotRunning);
        assert!(f.process.is_alive(outcome.started.pid));
    }
}
