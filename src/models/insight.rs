use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::enums::{InsightKind, RecordType};

/// Where the insight text came from. Serialized as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum InsightSource {
    /// Rule engine as the configured path (external generation disabled).
    Algorithm,
    /// Rule engine after the external path was attempted and failed.
    Fallback,
    /// Remote text-generation service, by name.
    External(String),
}

impl InsightSource {
    pub fn as_str(&self) -> &str {
        match self {
            InsightSource::Algorithm => "algorithm",
            InsightSource::Fallback => "fallback",
            InsightSource::External(name) => name,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, InsightSource::External(_))
    }
}

impl From<InsightSource> for String {
    fn from(source: InsightSource) -> Self {
        source.as_str().to_string()
    }
}

impl From<String> for InsightSource {
    fn from(s: String) -> Self {
        match s.as_str() {
            "algorithm" => InsightSource::Algorithm,
            "fallback" => InsightSource::Fallback,
            _ => InsightSource::External(s),
        }
    }
}

impl std::fmt::Display for InsightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished, persistable insight. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub user_id: String,
    pub generated_text: String,
    pub source_collection: RecordType,
    pub source_record_id: String,
    pub sanitized_source_data: Map<String, Value>,
    pub source: InsightSource,
    pub kind: InsightKind,
}

/// An insight as written to a sink, with write-time identity and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInsight {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub insight: Insight,
}

impl StoredInsight {
    /// Stamp an insight at write time.
    pub fn stamp(insight: Insight) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            insight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Insight {
        Insight {
            user_id: "u1".into(),
            generated_text: "BP STATUS: NORMAL".into(),
            source_collection: RecordType::VitalSigns,
            source_record_id: "rec-1".into(),
            sanitized_source_data: Map::new(),
            source: InsightSource::External("openai".into()),
            kind: InsightKind::Clinical,
        }
    }

    #[test]
    fn source_labels() {
        assert_eq!(InsightSource::Algorithm.as_str(), "algorithm");
        assert_eq!(InsightSource::Fallback.as_str(), "fallback");
        assert_eq!(InsightSource::External("openai".into()).to_string(), "openai");
        assert!(!InsightSource::Fallback.is_external());
    }

    #[test]
    fn stored_insight_flattens_fields() {
        let stored = StoredInsight::stamp(sample());
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["source_collection"], "vital_signs");
        assert_eq!(json["kind"], "clinical");
        assert_eq!(json["source"], "openai");
        assert!(json.get("timestamp").is_some());
        assert!(json.get("insight").is_none());
    }

    #[test]
    fn stored_insight_round_trips() {
        let stored = StoredInsight::stamp(sample());
        let line = serde_json::to_string(&stored).unwrap();
        let back: StoredInsight = serde_json::from_str(&line).unwrap();
        assert_eq!(back, stored);
    }
}
