// Application Layer - Supervision use cases

pub mod cancel;
pub mod constants;
pub mod log_follow;
pub mod summary;
pub mod supervisor;

// Re-exports
pub use cancel::{cancel_channel, CancelHandle, CancelToken};
pub use log_follow::LogFollower;
pub use supervisor::{Supervisor, SupervisorConfig};
