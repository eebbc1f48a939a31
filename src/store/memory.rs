use std::collections::HashMap;
use std::sync::Mutex;

use super::{InsightSink, ProfileStore, StoreError};
use crate::models::{Insight, StoredInsight, UserProfile};

/// In-memory profile store.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: HashMap<String, UserProfile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, user_id: &str, profile: UserProfile) -> Self {
        self.profiles.insert(user_id.to_string(), profile);
        self
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.get(user_id).cloned())
    }
}

/// In-memory append-only sink. Can be set to reject every write.
#[derive(Debug, Default)]
pub struct MemoryInsightSink {
    written: Mutex<Vec<StoredInsight>>,
    reject_writes: bool,
}

impl MemoryInsightSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every append fails.
    pub fn rejecting() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<StoredInsight> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.written.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InsightSink for MemoryInsightSink {
    fn append(&self, insight: Insight) -> Result<StoredInsight, StoreError> {
        if self.reject_writes {
            return Err(StoreError::Unavailable("sink rejects writes".into()));
        }
        let stored = StoredInsight::stamp(insight);
        self.written
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(stored.clone());
        Ok(stored)
    }
}
