use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::RecordType;
use super::RecordError;

/// Raw payload handed over by the record-creation trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub record_type: String,
    pub record_id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl TriggerEvent {
    pub fn new(record_type: &str, record_id: &str, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            record_type: record_type.to_string(),
            record_id: record_id.to_string(),
            fields,
        }
    }
}

// ═══════════════════════════════════════════
// Per-type field sets
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityFields {
    pub steps: Option<f64>,
    pub calories: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSignsFields {
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub pulse: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightFields {
    /// Current weight in kg (`weight` or `current`).
    pub current: Option<f64>,
    /// Change over the reporting interval in kg, signed.
    pub change: Option<f64>,
    pub bmi: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomFields {
    /// Reported symptom phrases, in the order they were logged.
    pub reported: Vec<String>,
    /// Intake logged alongside the symptoms (`food_consumed` on day logs).
    #[serde(default)]
    pub intake: Vec<String>,
}

impl SymptomFields {
    /// All reported phrases joined for display and matching.
    pub fn joined(&self) -> String {
        self.reported.join(", ")
    }

    /// The logged intake as a consumption entry.
    pub fn intake_fields(&self) -> ConsumptionFields {
        ConsumptionFields {
            items: self.intake.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureFields {
    /// Body temperature in °C.
    pub celsius: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionFields {
    /// Free-text intake entries (`stuff_consumed` / `food_consumed`).
    pub items: Vec<String>,
}

impl ConsumptionFields {
    pub fn joined(&self) -> String {
        self.items.join(", ")
    }
}

/// Strongly-typed measurement, one variant per record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum Measurement {
    Activity(ActivityFields),
    VitalSigns(VitalSignsFields),
    Weight(WeightFields),
    Symptoms(SymptomFields),
    Temperature(TemperatureFields),
    Consumption(ConsumptionFields),
}

impl Measurement {
    pub fn record_type(&self) -> RecordType {
        match self {
            Measurement::Activity(_) => RecordType::Activity,
            Measurement::VitalSigns(_) => RecordType::VitalSigns,
            Measurement::Weight(_) => RecordType::Weight,
            Measurement::Symptoms(_) => RecordType::Symptoms,
            Measurement::Temperature(_) => RecordType::Temperature,
            Measurement::Consumption(_) => RecordType::Consumption,
        }
    }

    /// Read the typed field set for `record_type` out of a raw field map.
    /// Fields with an unusable shape are treated as absent.
    pub fn from_fields(record_type: RecordType, fields: &Map<String, Value>) -> Self {
        match record_type {
            RecordType::Activity => Measurement::Activity(ActivityFields {
                steps: number_field(fields, &["steps"]),
                calories: number_field(fields, &["calories"]),
            }),
            RecordType::VitalSigns => Measurement::VitalSigns(VitalSignsFields {
                systolic: number_field(fields, &["systolic"]),
                diastolic: number_field(fields, &["diastolic"]),
                pulse: number_field(fields, &["pulse"]),
            }),
            RecordType::Weight => Measurement::Weight(WeightFields {
                current: number_field(fields, &["weight", "current"]),
                change: number_field(fields, &["change"]),
                bmi: number_field(fields, &["bmi"]),
            }),
            RecordType::Symptoms => Measurement::Symptoms(SymptomFields {
                reported: text_list(fields, &["symptom", "symptoms"]),
                intake: text_list(fields, &["food_consumed"]),
            }),
            RecordType::Temperature => Measurement::Temperature(TemperatureFields {
                celsius: number_field(fields, &["temperature"]),
            }),
            RecordType::Consumption => Measurement::Consumption(ConsumptionFields {
                items: text_list(fields, &["stuff_consumed", "food_consumed"]),
            }),
        }
    }
}

/// A newly written health-tracking record. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthRecord {
    pub record_id: String,
    pub user_id: String,
    pub measurement: Measurement,
    /// Original field map as written by the client.
    pub fields: Map<String, Value>,
}

impl HealthRecord {
    /// Parse a trigger event into a typed record.
    pub fn from_event(event: &TriggerEvent) -> Result<Self, RecordError> {
        let record_type = RecordType::from_collection(&event.record_type)?;

        if event.record_id.trim().is_empty() {
            return Err(RecordError::MissingRecordId);
        }

        let user_id = event
            .fields
            .get("user_id")
            .or_else(|| event.fields.get("userId"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(RecordError::MissingUserId)?
            .to_string();

        Ok(Self {
            record_id: event.record_id.clone(),
            user_id,
            measurement: Measurement::from_fields(record_type, &event.fields),
            fields: event.fields.clone(),
        })
    }

    pub fn record_type(&self) -> RecordType {
        self.measurement.record_type()
    }
}

// ═══════════════════════════════════════════
// Field helpers
// ═══════════════════════════════════════════

/// First usable number among `keys`. Accepts JSON numbers and numeric strings.
fn number_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| fields.get(*key).and_then(number_value))
}

/// Finite number from a JSON number or numeric string.
pub(crate) fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Keys whose plain-string form is a comma-separated list.
const LIST_KEYS: &[&str] = &["symptoms"];

/// Collect non-empty strings from every key, flattening string arrays.
fn text_list(fields: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for key in keys {
        match fields.get(*key) {
            Some(Value::String(s)) if LIST_KEYS.contains(key) => {
                for part in s.split(',') {
                    push_text(&mut out, part);
                }
            }
            Some(Value::String(s)) => push_text(&mut out, s),
            Some(Value::Array(items)) => {
                for item in items {
                    if let Value::String(s) = item {
                        push_text(&mut out, s);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn push_text(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Render a measurement for text output: integers without a fraction,
/// everything else rounded to two decimals.
pub fn display_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(record_type: &str, fields: Value) -> TriggerEvent {
        TriggerEvent::new(record_type, "rec-1", fields)
    }

    #[test]
    fn parses_vital_signs() {
        let record = HealthRecord::from_event(&event(
            "vital_signs",
            json!({"user_id": "u1", "systolic": 145, "diastolic": "85", "pulse": 88.5}),
        ))
        .unwrap();
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.record_type(), RecordType::VitalSigns);
        assert_eq!(
            record.measurement,
            Measurement::VitalSigns(VitalSignsFields {
                systolic: Some(145.0),
                diastolic: Some(85.0),
                pulse: Some(88.5),
            })
        );
    }

    #[test]
    fn missing_user_id_is_rejected() {
        let err = HealthRecord::from_event(&event("weight", json!({"change": 1.0}))).unwrap_err();
        assert!(matches!(err, RecordError::MissingUserId));

        let err = HealthRecord::from_event(&event("weight", json!({"user_id": "  "}))).unwrap_err();
        assert!(matches!(err, RecordError::MissingUserId));
    }

    #[test]
    fn empty_record_id_is_rejected() {
        let ev = TriggerEvent::new("weight", "", json!({"user_id": "u1"}));
        assert!(matches!(
            HealthRecord::from_event(&ev).unwrap_err(),
            RecordError::MissingRecordId
        ));
    }

    #[test]
    fn unsupported_collection_is_rejected() {
        let err = HealthRecord::from_event(&event("Insites", json!({"user_id": "u1"}))).unwrap_err();
        assert!(matches!(err, RecordError::UnsupportedRecordType(_)));
    }

    #[test]
    fn non_numeric_values_are_treated_as_absent() {
        let record = HealthRecord::from_event(&event(
            "activity",
            json!({"user_id": "u1", "steps": "lots", "calories": {"kcal": 300}}),
        ))
        .unwrap();
        assert_eq!(record.measurement, Measurement::Activity(ActivityFields::default()));
    }

    #[test]
    fn symptom_and_symptoms_are_merged() {
        let record = HealthRecord::from_event(&event(
            "symptoms",
            json!({"user_id": "u1", "symptom": "headache", "symptoms": ["swelling", "", 4]}),
        ))
        .unwrap();
        match record.measurement {
            Measurement::Symptoms(s) => assert_eq!(s.reported, vec!["headache", "swelling"]),
            other => panic!("unexpected measurement: {other:?}"),
        }
    }

    #[test]
    fn comma_separated_symptoms_are_split() {
        let record = HealthRecord::from_event(&event(
            "symptoms",
            json!({"user_id": "u1", "symptoms": "nausea, swelling ,"}),
        ))
        .unwrap();
        match record.measurement {
            Measurement::Symptoms(s) => assert_eq!(s.reported, vec!["nausea", "swelling"]),
            other => panic!("unexpected measurement: {other:?}"),
        }
    }

    #[test]
    fn legacy_day_log_reads_symptoms() {
        let record = HealthRecord::from_event(&event(
            "day",
            json!({"user_id": "u1", "symptoms": ["nausea"], "food_consumed": "toast"}),
        ))
        .unwrap();
        assert_eq!(record.record_type(), RecordType::Symptoms);
        match record.measurement {
            Measurement::Symptoms(s) => {
                assert_eq!(s.reported, vec!["nausea"]);
                assert_eq!(s.intake, vec!["toast"]);
            }
            other => panic!("unexpected measurement: {other:?}"),
        }
    }

    #[test]
    fn weight_reads_current_alias() {
        let record = HealthRecord::from_event(&event(
            "weight",
            json!({"user_id": "u1", "current": 72.4, "change": -0.3}),
        ))
        .unwrap();
        assert_eq!(
            record.measurement,
            Measurement::Weight(WeightFields {
                current: Some(72.4),
                change: Some(-0.3),
                bmi: None,
            })
        );
    }

    #[test]
    fn display_number_trims_fraction() {
        assert_eq!(display_number(170.0), "170");
        assert_eq!(display_number(2.345), "2.35");
        assert_eq!(display_number(-0.5), "-0.5");
    }
}
