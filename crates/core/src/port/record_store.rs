// Supervision Record Port
// The PID marker is the only state persisted between invocations

use crate::domain::Pid;
use thiserror::Error;

/// Record store errors
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record does not hold a valid PID: {content:?}")]
    Corrupt { content: String },
}

/// Narrowly-scoped access to the Supervision Record
///
/// At most one record exists. Its presence only means "last started by us",
/// the process it names may be long gone.
pub trait RecordStore: Send + Sync {
    /// Read the recorded PID, `None` when no record exists
    ///
    /// # Errors
    /// - RecordError::Corrupt if the record exists but does not hold a PID
    fn load(&self) -> Result<Option<Pid>, RecordError>;

    /// Create or overwrite the record
    fn save(&self, pid: Pid) -> Result<(), RecordError>;

    /// Remove the record, returning whether one existed
    ///
    /// A missing record is not an error.
    fn delete(&self) -> Result<bool, RecordError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryState {
        content: Option<String>,
        mutations: usize,
    }

    /// In-memory record store
    #[derive(Default)]
    pub struct MemoryRecordStore {
        state: Arc<Mutex<MemoryState>>,
    }

    impl MemoryRecordStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed raw content, e.g. garbage for corruption tests
        pub fn with_content(content: impl Into<String>) -> Self {
            let store = Self::new();
            store.state.lock().unwrap().content = Some(content.into());
            store
        }

        pub fn raw(&self) -> Option<String> {
            self.state.lock().unwrap().content.clone()
        }

        /// Number of save/delete calls that touched an existing or new record
        pub fn mutations(&self) -> usize {
            self.state.lock().unwrap().mutations
        }
    }

    impl RecordStore for MemoryRecordStore {
        fn load(&self) -> Result<Option<Pid>, RecordError> {
            match &self.state.lock().unwrap().content {
                None => Ok(None),
                Some(content) => content
                    .parse()
                    .map(Some)
                    .map_err(|_| RecordError::Corrupt {
                        content: content.clone(),
                    }),
            }
        }

        fn save(&self, pid: Pid) -> Result<(), RecordError> {
            let mut state = self.state.lock().unwrap();
            state.content = Some(format!("{pid}\n"));
            state.mutations += 1;
            Ok(())
        }

        fn delete(&self) -> Result<bool, RecordError> {
            let mut state = self.state.lock().unwrap();
            let existed = state.content.take().is_some();
            if existed {
                state.mutations += 1;
            }
            Ok(existed)
        }
    }
}
