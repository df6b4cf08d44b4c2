// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid process identifier: {0:?}")]
    InvalidPid(String),

    #[error("Invalid log pattern: {0}")]
    InvalidLogPattern(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
