// pipectl Infrastructure - System Adapters
// Implements: ProcessControl (x2), RecordStore, LogSource

pub mod log_files;
pub mod pid_file;
#[cfg(unix)]
pub mod posix_control;
pub mod process_table_control;

mod process_scan;
mod spawn;

pub use log_files::FileLogSource;
pub use pid_file::PidFile;
#[cfg(unix)]
pub use posix_control::PosixProcessControl;
pub use process_table_control::ProcessTableControl;
