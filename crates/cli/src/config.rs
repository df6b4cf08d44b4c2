//! Layered configuration
//!
//! Later layers win:
//! 1. built-in defaults
//! 2. `[logging] log_dir` from the pipeline's own `config.ini`
//! 3. `pipectl.toml` in the working directory
//! 4. `PIPECTL_*` environment variables
//! 5. command-line flags

use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use pipectl_core::application::constants::{
    DEFAULT_ARGS, DEFAULT_LOG_DIR, DEFAULT_LOG_PREFIX, DEFAULT_LOG_SUFFIX, DEFAULT_OUTPUT_LOG,
    DEFAULT_PID_FILE, DEFAULT_POLL_INTERVAL, DEFAULT_PROGRAM, DEFAULT_SETTLE_DELAY,
    DEFAULT_SUMMARY_LINES,
};
use pipectl_core::application::SupervisorConfig;
use pipectl_core::domain::{LaunchSpec, LogPattern, StatusKeywords};

/// Pipeline configuration file read for its log directory
const PIPELINE_CONFIG: &str = "config.ini";

/// Optional supervisor configuration file
const SUPERVISOR_CONFIG: &str = "pipectl.toml";

const ENV_PREFIX: &str = "PIPECTL";

/// Values given on the command line
#[derive(Debug, Default)]
pub struct Overrides {
    pub pid_file: Option<String>,
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub program: String,
    pub args: Vec<String>,
    pub pid_file: String,
    pub log_dir: String,
    pub log_prefix: String,
    pub log_suffix: String,
    pub output_log: String,
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub summary_lines: usize,
    #[serde(skip)]
    workdir: PathBuf,
}

impl Settings {
    pub fn load(workdir: &Path, overrides: &Overrides) -> Result<Self> {
        let default_args: Vec<String> = DEFAULT_ARGS.iter().map(|s| s.to_string()).collect();
        let log_dir = pipeline_log_dir(workdir).unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        let config = Config::builder()
            .set_default("program", DEFAULT_PROGRAM)?
            .set_default("args", default_args)?
            .set_default("pid_file", DEFAULT_PID_FILE)?
            .set_default("log_dir", log_dir)?
            .set_default("log_prefix", DEFAULT_LOG_PREFIX)?
            .set_default("log_suffix", DEFAULT_LOG_SUFFIX)?
            .set_default("output_log", DEFAULT_OUTPUT_LOG)?
            .set_default("settle_delay_ms", DEFAULT_SETTLE_DELAY.as_millis() as u64)?
            .set_default("poll_interval_ms", DEFAULT_POLL_INTERVAL.as_millis() as u64)?
            .set_default("summary_lines", DEFAULT_SUMMARY_LINES as u64)?
            .add_source(
                File::from(workdir.join(SUPERVISOR_CONFIG))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("args"),
            )
            .set_override_option("pid_file", overrides.pid_file.clone())?
            .set_override_option("log_dir", overrides.log_dir.clone())?
            .build()
            .context("Failed to load configuration")?;

        let mut settings: Settings = config
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.workdir = workdir.to_path_buf();

        debug!(settings = ?settings, "Configuration loaded");
        Ok(settings)
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn pid_file_path(&self) -> PathBuf {
        self.resolve(&self.pid_file)
    }

    pub fn log_dir_path(&self) -> PathBuf {
        self.resolve(&self.log_dir)
    }

    pub fn launch_spec(&self) -> LaunchSpec {
        LaunchSpec::new(
            self.program.clone(),
            self.args.clone(),
            self.workdir.clone(),
            self.log_dir_path().join(&self.output_log),
        )
    }

    pub fn log_pattern(&self) -> Result<LogPattern> {
        LogPattern::new(self.log_dir_path(), &self.log_prefix, &self.log_suffix)
            .context("Invalid log file pattern")
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            summary_lines: self.summary_lines,
            keywords: StatusKeywords::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `~` expansion, then relative paths hang off the working directory
    fn resolve(&self, raw: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(raw).into_owned());
        if expanded.is_absolute() {
            expanded
        } else {
            self.workdir.join(expanded)
        }
    }
}

/// `[logging] log_dir` from the pipeline's config.ini, when present and readable
fn pipeline_log_dir(workdir: &Path) -> Option<String> {
    let path = workdir.join(PIPELINE_CONFIG);
    if !path.is_file() {
        return None;
    }

    let ini = match Config::builder()
        .add_source(File::from(path.clone()).format(FileFormat::Ini))
        .build()
    {
        Ok(ini) => ini,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable pipeline config");
            return None;
        }
    };

    match ini.get_string("logging.log_dir") {
        Ok(dir) if !dir.trim().is_empty() => Some(dir.trim().to_string()),
        Ok(_) | Err(ConfigError::NotFound(_)) => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring invalid logging.log_dir");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();

        let settings = Settings::load(dir, &Overrides::default()).unwrap();

        assert_eq!(settings.program, "python");
        assert_eq!(settings.args, vec!["main.py".to_string()]);
        assert_eq!(settings.pid_file_path(), dir.join("pipeline.pid"));
        assert_eq!(
            settings.launch_spec().log_path,
            dir.join("logs").join("pipeline_output.log")
        );
        assert_eq!(settings.launch_spec().command_line(), "python main.py");
        assert_eq!(settings.supervisor_config().settle_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_pipeline_config_sets_log_dir() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(
            dir.join("config.ini"),
            "[paths]\ninput_dir = folders/input\n\n[logging]\nlog_dir = run_logs\nlog_level = INFO\n",
        )
        .unwrap();

        let settings = Settings::load(dir, &Overrides::default()).unwrap();

        assert_eq!(settings.log_dir_path(), dir.join("run_logs"));
    }

    #[test]
    fn test_toml_overrides_pipeline_config_and_flags_override_toml() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("config.ini"), "[logging]\nlog_dir = run_logs\n").unwrap();
        std::fs::write(
            dir.join("pipectl.toml"),
            "program = \"sleep\"\nargs = [\"600\"]\nlog_dir = \"toml_logs\"\nsettle_delay_ms = 0\n",
        )
        .unwrap();

        let settings = Settings::load(
            dir,
            &Overrides {
                pid_file: Some("/var/run/orca.pid".to_string()),
                log_dir: None,
            },
        )
        .unwrap();

        assert_eq!(settings.launch_spec().command_line(), "sleep 600");
        assert_eq!(settings.log_dir_path(), dir.join("toml_logs"));
        assert_eq!(settings.pid_file_path(), PathBuf::from("/var/run/orca.pid"));
        assert_eq!(settings.supervisor_config().settle_delay, Duration::ZERO);
    }

    #[test]
    fn test_pipeline_config_without_logging_section() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("config.ini"), "[paths]\noutput_dir = folders/output\n").unwrap();

        let settings = Settings::load(dir, &Overrides::default()).unwrap();

        assert_eq!(settings.log_dir_path(), dir.join("logs"));
    }
}
