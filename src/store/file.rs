use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{InsightSink, ProfileStore, StoreError};
use crate::models::{Insight, StoredInsight, UserProfile};

/// Appends one JSON document per line.
pub struct JsonlInsightSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlInsightSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored insight, in write order.
    pub fn read_all(&self) -> Result<Vec<StoredInsight>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StoreError::from))
            .collect()
    }
}

impl InsightSink for JsonlInsightSink {
    fn append(&self, insight: Insight) -> Result<StoredInsight, StoreError> {
        let stored = StoredInsight::stamp(insight);
        let mut line = serde_json::to_string(&stored)?;
        line.push('\n');

        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;

        tracing::debug!(insight_id = %stored.id, kind = %stored.insight.kind, "Insight appended");
        Ok(stored)
    }
}

/// Reads `users/<user_id>.json` under a data directory.
pub struct JsonProfileStore {
    users_dir: PathBuf,
}

impl JsonProfileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            users_dir: data_dir.join("users"),
        }
    }

    fn profile_path(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !user_id.is_empty()
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(user_id.to_string()));
        }
        Ok(self.users_dir.join(format!("{user_id}.json")))
    }
}

impl ProfileStore for JsonProfileStore {
    fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let path = self.profile_path(user_id)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{InsightKind, InsightSource, RecordType};

    fn insight(kind: InsightKind) -> Insight {
        Insight {
            user_id: "u-1".into(),
            generated_text: "INTAKE STATUS: LOGGED.".into(),
            source_collection: RecordType::Consumption,
            source_record_id: "rec-9".into(),
            sanitized_source_data: Map::new(),
            source: InsightSource::Fallback,
            kind,
        }
    }

    #[test]
    fn jsonl_sink_appends_lines() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlInsightSink::new(dir.path().join("nested").join("insights.jsonl"));

        let first = sink.append(insight(InsightKind::Clinical)).unwrap();
        sink.append(insight(InsightKind::Dietary)).unwrap();

        let all = sink.read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].insight.kind, InsightKind::Dietary);

        let raw = fs::read_to_string(sink.path()).unwrap();
        assert!(raw.lines().next().unwrap().contains("\"source\":\"fallback\""));
    }

    #[test]
    fn empty_sink_reads_nothing() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlInsightSink::new(dir.path().join("none.jsonl"));
        assert!(sink.read_all().unwrap().is_empty());
    }

    #[test]
    fn profile_store_reads_user_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("users")).unwrap();
        fs::write(
            dir.path().join("users").join("u-1.json"),
            r#"{"gravida": 3, "parity": 2, "email": "x@y.z"}"#,
        )
        .unwrap();

        let store = JsonProfileStore::new(dir.path());
        let profile = store.load_profile("u-1").unwrap().unwrap();
        assert_eq!(profile.gravida, Some(3));
        assert_eq!(profile.parity, Some(2));
        assert!(store.load_profile("u-2").unwrap().is_none());
    }

    #[test]
    fn profile_store_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let store = JsonProfileStore::new(dir.path());
        assert!(matches!(
            store.load_profile("../secrets"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn malformed_profile_error_kind_omits_content() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("users")).unwrap();
        fs::write(
            dir.path().join("users").join("u-1.json"),
            r#"{"gravida": "third pregnancy, prior stillbirth at 32 weeks"}"#,
        )
        .unwrap();

        let err = JsonProfileStore::new(dir.path()).load_profile("u-1").unwrap_err();
        assert_eq!(err.kind(), "serialization");
        // The Display form quotes the offending value
        assert!(err.to_string().contains("stillbirth"));
        assert!(!err.kind().contains("stillbirth"));

        let err = JsonProfileStore::new(dir.path()).load_profile("jane.doe@example.com").unwrap_err();
        assert_eq!(err.kind(), "invalid_key");
    }
}
