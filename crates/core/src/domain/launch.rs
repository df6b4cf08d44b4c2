// Launch description for the supervised pipeline

use serde::Serialize;
use std::path::PathBuf;

/// How to start the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Combined stdout/stderr destination, opened in append mode
    pub log_path: PathBuf,
}

impl LaunchSpec {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            log_path: log_path.into(),
        }
    }

    /// Program and arguments joined by single spaces
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Pattern used to find the pipeline when no record exists
    pub fn pattern(&self) -> CommandLinePattern {
        CommandLinePattern::new(self.command_line())
    }
}

/// Substring match over a process's full command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLinePattern(String);

impl CommandLinePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the space-joined `argv` contains the pattern
    ///
    /// An empty pattern matches nothing.
    pub fn matches<S: AsRef<str>>(&self, argv: &[S]) -> bool {
        if self.0.trim().is_empty() {
            return false;
        }
        let joined = argv
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(" ");
        joined.contains(&self.0)
    }
}

impl std::fmt::Display for CommandLinePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LaunchSpec {
        LaunchSpec::new(
            "python",
            vec!["main.py".to_string()],
            "/srv/orca",
            "/srv/orca/logs/pipeline_output.log",
        )
    }

    #[test]
    fn test_command_line_and_pattern() {
        let spec = spec();
        assert_eq!(spec.command_line(), "python main.py");
        assert_eq!(spec.pattern().as_str(), "python main.py");
    }

    #[test]
    fn test_pattern_matches_full_command_line() {
        let pattern = spec().pattern();
        assert!(pattern.matches(&["/usr/bin/python", "main.py"]));
        assert!(pattern.matches(&["python", "main.py", "--verbose"]));
        assert!(!pattern.matches(&["python", "other.py"]));
        assert!(!pattern.matches(&["python3", "main.py"]));
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        let pattern = CommandLinePattern::new("  ");
        assert!(!pattern.matches(&["python", "main.py"]));
        assert!(!pattern.matches::<&str>(&[]));
    }
}
