// Log Source Port
// Read access to the pipeline's log files, for summaries and follow mode

use crate::domain::LogLine;

/// Log source trait
///
/// Implementations:
/// - FileLogSource: files matching a LogPattern on disk
/// - ScriptedLogSource: pre-scripted batches for tests
pub trait LogSource: Send + Sync {
    /// Newest `limit` lines accepted by `keep`, returned oldest first
    ///
    /// Files are read newest first from their end backwards, so the cost
    /// follows the distance to the `limit`-th accepted line, not the total
    /// size of the logs.
    fn read_recent(
        &self,
        limit: usize,
        keep: &dyn Fn(&str) -> bool,
    ) -> crate::Result<Vec<LogLine>>;

    /// Lines appended since the previous poll
    ///
    /// The first poll after construction or `rewind` yields the trailing
    /// lines of each existing file.
    fn poll(&mut self) -> crate::Result<Vec<LogLine>>;

    /// Forget read positions so the next poll starts over
    fn rewind(&mut self);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;

    /// Yields one scripted batch per poll, then nothing
    pub struct ScriptedLogSource {
        script: Vec<Vec<LogLine>>,
        pending: VecDeque<Vec<LogLine>>,
        polls: usize,
    }

    impl ScriptedLogSource {
        pub fn new(script: Vec<Vec<LogLine>>) -> Self {
            Self {
                pending: script.iter().cloned().collect(),
                script,
                polls: 0,
            }
        }

        /// Convenience: one file, one text batch per inner slice
        pub fn from_text(file: &str, batches: &[&[&str]]) -> Self {
            Self::new(
                batches
                    .iter()
                    .map(|batch| batch.iter().map(|t| LogLine::new(file, *t)).collect())
                    .collect(),
            )
        }

        pub fn polls(&self) -> usize {
            self.polls
        }
    }

    impl LogSource for ScriptedLogSource {
        fn read_recent(
            &self,
            limit: usize,
            keep: &dyn Fn(&str) -> bool,
        ) -> crate::Result<Vec<LogLine>> {
            let kept: Vec<LogLine> = self
                .script
                .iter()
                .flatten()
                .filter(|l| keep(l.text.as_str()))
                .cloned()
                .collect();
            let start = kept.len().saturating_sub(limit);
            Ok(kept[start..].to_vec())
        }

        fn poll(&mut self) -> crate::Result<Vec<LogLine>> {
            self.polls += 1;
            Ok(self.pending.pop_front().unwrap_or_default())
        }

        fn rewind(&mut self) {
            self.pending = self.script.iter().cloned().collect();
        }
    }

    /// Always fails, for best-effort paths
    pub struct BrokenLogSource;

    impl BrokenLogSource {
        fn fail() -> crate::AppError {
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "logs unreadable").into()
        }
    }

    impl LogSource for BrokenLogSource {
        fn read_recent(
            &self,
            _limit: usize,
            _keep: &dyn Fn(&str) -> bool,
        ) -> crate::Result<Vec<LogLine>> {
            Err(Self::fail())
        }

        fn poll(&mut self) -> crate::Result<Vec<LogLine>> {
            Err(Self::fail())
        }

        fn rewind(&mut self) {}
    }
}
