// Port Layer - Interfaces for external dependencies

pub mod log_source;
pub mod process_control;
pub mod record_store;

// Re-exports
pub use log_source::LogSource;
pub use process_control::{ProcessControl, ProcessError};
pub use record_store::{RecordError, RecordStore};
