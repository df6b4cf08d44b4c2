// Supervisor defaults (no magic values in handlers)
use std::time::Duration;

/// Program started by `start` (with DEFAULT_ARGS)
pub const DEFAULT_PROGRAM: &str = "python";

/// Fixed argument set; program + args also form the command-line match pattern
pub const DEFAULT_ARGS: &[&str] = &["main.py"];

/// Supervision Record, relative to the working directory
pub const DEFAULT_PID_FILE: &str = "pipeline.pid";

/// Directory holding the pipeline's log files
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Log files are `<prefix>*<suffix>` inside the log directory
pub const DEFAULT_LOG_PREFIX: &str = "pipeline_";
pub const DEFAULT_LOG_SUFFIX: &str = ".log";

/// Where `start` redirects combined stdout/stderr (matches the log pattern)
pub const DEFAULT_OUTPUT_LOG: &str = "pipeline_output.log";

/// Pause between stop and start during restart (2s)
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Follow-mode poll interval (250ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Keyword lines shown by `status`
pub const DEFAULT_SUMMARY_LINES: usize = 5;

/// Initial tail length per file in follow mode (same as `tail`)
pub const DEFAULT_TAIL_LINES: usize = 10;
