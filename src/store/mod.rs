//! Collaborators the pipeline reads from and writes to.

pub mod file;
pub mod memory;

pub use file::{JsonProfileStore, JsonlInsightSink};
pub use memory::{MemoryInsightSink, MemoryProfileStore};

use thiserror::Error;

use crate::models::{Insight, StoredInsight, UserProfile};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Stable label for logs. Never includes paths, keys or offending values.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::InvalidKey(_) => "invalid_key",
            Self::LockPoisoned => "lock_poisoned",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

/// Read-only user profile lookup.
pub trait ProfileStore {
    /// `Ok(None)` when the user has no profile.
    fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;
}

/// Append-only insight target. Assigns id and timestamp at write time.
pub trait InsightSink {
    fn append(&self, insight: Insight) -> Result<StoredInsight, StoreError>;
}
