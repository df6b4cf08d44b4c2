// Follow mode over a LogSource
// Lazy, restartable, cancelled through CancelToken between reads

use futures::stream::{self, Stream};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

use crate::application::cancel::CancelToken;
use crate::domain::LogLine;
use crate::error::Result;
use crate::port::LogSource;

/// Tails a log source until cancelled
pub struct LogFollower {
    source: Box<dyn LogSource>,
    poll_interval: Duration,
    token: CancelToken,
    /// Previous read failed; wait one interval before retrying
    backoff: bool,
}

impl LogFollower {
    pub fn new(source: Box<dyn LogSource>, poll_interval: Duration, token: CancelToken) -> Self {
        Self {
            source,
            poll_interval,
            token,
            backoff: false,
        }
    }

    /// Wait for the next non-empty batch of lines
    ///
    /// Returns `Ok(None)` once cancellation is requested; the token is
    /// checked before every read and while sleeping between reads.
    /// A read error is returned once, and the next call waits a full
    /// interval before reading again.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<LogLine>>> {
        if std::mem::take(&mut self.backoff) && !self.wait().await {
            return Ok(None);
        }

        loop {
            if self.token.is_cancelled() {
                debug!("Follow cancelled");
                return Ok(None);
            }

            let lines = match self.source.poll() {
                Ok(lines) => lines,
                Err(e) => {
                    self.backoff = true;
                    return Err(e);
                }
            };
            if !lines.is_empty() {
                return Ok(Some(lines));
            }

            if !self.wait().await {
                return Ok(None);
            }
        }
    }

    /// Sleep one poll interval; false when cancelled meanwhile
    async fn wait(&mut self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.poll_interval) => true,
            _ = self.token.cancelled() => {
                debug!("Follow cancelled while waiting");
                false
            }
        }
    }

    /// Start over from the initial tail on the next read
    pub fn restart(&mut self) {
        self.source.rewind();
    }

    /// Line-by-line stream; ends when cancelled
    ///
    /// Read errors are yielded as items and do not end the stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<LogLine>> {
        stream::unfold(
            (self, VecDeque::new()),
            |(mut follower, mut pending)| async move {
                loop {
                    if let Some(line) = pending.pop_front() {
                        return Some((Ok(line), (follower, pending)));
                    }
                    match follower.next_batch().await {
                        Ok(Some(batch)) => pending.extend(batch),
                        Ok(None) => return None,
                        Err(e) => return Some((Err(e), (follower, pending))),
                    }
                }
            },
        )
    }
}
