// Process identifier value object

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{DomainError, Result};

/// Operating-system process identifier
///
/// Always positive and representable as a signed 32-bit value, so it can be
/// handed to POSIX signal APIs without truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Pid(u32);

impl Pid {
    pub fn new(raw: u32) -> Result<Self> {
        if raw == 0 || raw > i32::MAX as u32 {
            return Err(DomainError::InvalidPid(raw.to_string()));
        }
        Ok(Self(raw))
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Signed form used by POSIX `kill(2)`
    pub fn as_raw(self) -> i32 {
        // Bounded by `new`
        self.0 as i32
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pid {
    type Err = DomainError;

    /// Parse the textual form stored in a PID file (surrounding whitespace allowed)
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let raw: u32 = trimmed
            .parse()
            .map_err(|_| DomainError::InvalidPid(trimmed.to_string()))?;
        Self::new(raw)
    }
}

impl TryFrom<u32> for Pid {
    type Error = DomainError;

    fn try_from(raw: u32) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<Pid> for u32 {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}
