// Log file naming and status keywords

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::error::{DomainError, Result};

/// One line read from a pipeline log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub file: PathBuf,
    pub text: String,
}

impl LogLine {
    pub fn new(file: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            text: text.into(),
        }
    }
}

/// Log files named `<prefix><anything><suffix>` inside a single directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPattern {
    dir: PathBuf,
    prefix: String,
    suffix: String,
}

impl LogPattern {
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.into();
        let suffix = suffix.into();

        if prefix.is_empty() && suffix.is_empty() {
            return Err(DomainError::InvalidLogPattern(
                "prefix and suffix cannot both be empty".to_string(),
            ));
        }
        if prefix.contains(['/', '\\']) || suffix.contains(['/', '\\']) {
            return Err(DomainError::InvalidLogPattern(format!(
                "{prefix}*{suffix} must not contain path separators"
            )));
        }

        Ok(Self {
            dir: dir.into(),
            prefix,
            suffix,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a bare file name belongs to this pattern
    pub fn matches_name(&self, name: &str) -> bool {
        name.len() >= self.prefix.len() + self.suffix.len()
            && name.starts_with(&self.prefix)
            && name.ends_with(&self.suffix)
    }

    /// Shell-style rendering, e.g. `logs/pipeline_*.log`
    pub fn display(&self) -> String {
        self.dir
            .join(format!("{}*{}", self.prefix, self.suffix))
            .display()
            .to_string()
    }
}

/// Keywords that mark a log line as interesting for `status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusKeywords(Vec<String>);

impl StatusKeywords {
    pub const DEFAULT: [&'static str; 3] = ["queued", "completed", "failed"];

    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        )
    }

    /// Case-insensitive containment of any keyword
    pub fn matches(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.0.iter().any(|k| lower.contains(k.as_str()))
    }
}

impl Default for StatusKeywords {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}
