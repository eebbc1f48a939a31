// Filter a record's field map before it is stored next to an insight.
// Drops device, location, contact, insurance, family-history and private
// note fields at any depth; truncates long free text.

use serde_json::{Map, Value};

/// Longest free-text value kept verbatim (characters).
pub const MAX_FREE_TEXT_CHARS: usize = 100;

/// Appended to truncated free text.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Field names removed from persisted copies. Compared case-insensitively.
pub const STRIPPED_FIELDS: &[&str] = &[
    // device
    "device",
    "device_id",
    "deviceid",
    "device_model",
    "device_info",
    "ip_address",
    // location
    "location",
    "latitude",
    "longitude",
    "lat",
    "lng",
    "coordinates",
    "gps",
    // contact and demographics
    "patient_name",
    "email",
    "phone",
    "phone_number",
    "address",
    "date_of_birth",
    // insurance
    "insurance",
    "insurance_id",
    "insurance_provider",
    "policy_number",
    // history and private notes
    "family_history",
    "personal_notes",
    "private_notes",
    "clinician_notes",
];

/// Counts of what sanitization changed. Safe to log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeReport {
    pub removed: usize,
    pub truncated: usize,
}

/// Filtered copy of `fields`. Pure and total.
pub fn sanitize_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    sanitize_fields_with_report(fields).0
}

pub fn sanitize_fields_with_report(fields: &Map<String, Value>) -> (Map<String, Value>, SanitizeReport) {
    let mut report = SanitizeReport::default();
    let cleaned = sanitize_map(fields, &mut report);
    (cleaned, report)
}

fn is_stripped(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    STRIPPED_FIELDS.contains(&lower.as_str())
}

fn sanitize_map(fields: &Map<String, Value>, report: &mut SanitizeReport) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in fields {
        if is_stripped(key) {
            report.removed += 1;
            continue;
        }
        out.insert(key.clone(), sanitize_value(value, report));
    }
    out
}

fn sanitize_value(value: &Value, report: &mut SanitizeReport) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_text(s, report)),
        Value::Array(items) => Value::Array(items.iter().map(|v| sanitize_value(v, report)).collect()),
        Value::Object(map) => Value::Object(sanitize_map(map, report)),
        other => other.clone(),
    }
}

fn truncate_text(text: &str, report: &mut SanitizeReport) -> String {
    if text.chars().count() <= MAX_FREE_TEXT_CHARS {
        return text.to_string();
    }
    report.truncated += 1;
    let kept: String = text.chars().take(MAX_FREE_TEXT_CHARS).collect();
    format!("{kept}{TRUNCATION_MARKER}")
}
