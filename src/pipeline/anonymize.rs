//! Redaction and tokenization of a record before it leaves the trust boundary.
//!
//! Only allow-listed fields are rendered (see `field_specs`). Numeric fields
//! are inlined; free-text fields are replaced by random opaque tokens whose
//! originals live in the prompt's token map. The patient is referenced by a
//! fixed placeholder that de-anonymization removes.

use std::collections::HashMap;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde_json::Value;

use super::prompt::{instruction_block, preamble, PromptVariant};
use super::AnonymizationError;
use crate::models::record::number_value;
use crate::models::{display_number, HealthRecord, RecordType, UserProfile};

/// Stand-in for the patient in prompts. Removed, never substituted.
pub const PATIENT_PLACEHOLDER: &str = "PATIENT_REF";

/// Prefix shared by every free-text token.
pub const TOKEN_PREFIX: &str = "ANON";

/// Random characters after the prefix.
pub const TOKEN_BODY_LENGTH: usize = 8;

/// Fields that identify the patient directly. Never rendered.
pub const DIRECT_IDENTIFIER_FIELDS: &[&str] = &[
    "user_id",
    "userId",
    "patient_name",
    "name",
    "email",
    "phone",
    "address",
    "date_of_birth",
];

/// Identifier values shorter than this are not scanned for (too many false hits).
const MIN_SCANNED_IDENTIFIER_LENGTH: usize = 4;

/// Fresh tokens tried per field before giving up.
const MAX_TOKEN_ATTEMPTS: usize = 4;

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

// ═══════════════════════════════════════════════════════════
// Token sources
// ═══════════════════════════════════════════════════════════

/// Supplies opaque tokens. Injected so tests can fix the sequence.
pub trait TokenSource {
    fn next_token(&mut self) -> String;
}

/// Token source drawing from any `rand` generator.
pub struct RngTokenSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RngTokenSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> TokenSource for RngTokenSource<R> {
    fn next_token(&mut self) -> String {
        let body: String = (0..TOKEN_BODY_LENGTH)
            .map(|_| TOKEN_ALPHABET[self.rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
            .collect();
        format!("{TOKEN_PREFIX}{body}")
    }
}

// ═══════════════════════════════════════════════════════════
// Field allow-list
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number { unit: &'static str },
    FreeText,
}

/// One allow-listed field: raw key, prompt label, and how it is rendered.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn number(key: &'static str, label: &'static str, unit: &'static str) -> FieldSpec {
    FieldSpec {
        key,
        label,
        kind: FieldKind::Number { unit },
    }
}

const fn text(key: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec {
        key,
        label,
        kind: FieldKind::FreeText,
    }
}

const ACTIVITY_FIELDS: &[FieldSpec] = &[
    number("steps", "Steps", ""),
    number("calories", "Calories", "kcal"),
];

const VITAL_SIGNS_FIELDS: &[FieldSpec] = &[
    number("systolic", "Systolic blood pressure", "mmHg"),
    number("diastolic", "Diastolic blood pressure", "mmHg"),
    number("pulse", "Pulse", "bpm"),
];

const WEIGHT_FIELDS: &[FieldSpec] = &[
    number("weight", "Weight", "kg"),
    number("current", "Current weight", "kg"),
    number("change", "Weight change", "kg"),
    number("bmi", "BMI", ""),
];

const SYMPTOM_FIELDS: &[FieldSpec] = &[
    text("symptom", "Reported symptom"),
    text("symptoms", "Reported symptoms"),
    text("food_consumed", "Food consumed"),
];

const TEMPERATURE_FIELDS: &[FieldSpec] = &[number("temperature", "Temperature", "°C")];

const CONSUMPTION_FIELDS: &[FieldSpec] = &[
    text("stuff_consumed", "Consumed"),
    text("food_consumed", "Food consumed"),
];

/// Fields that may be rendered into a prompt for `record_type`.
pub fn field_specs(record_type: RecordType) -> &'static [FieldSpec] {
    match record_type {
        RecordType::Activity => ACTIVITY_FIELDS,
        RecordType::VitalSigns => VITAL_SIGNS_FIELDS,
        RecordType::Weight => WEIGHT_FIELDS,
        RecordType::Symptoms => SYMPTOM_FIELDS,
        RecordType::Temperature => TEMPERATURE_FIELDS,
        RecordType::Consumption => CONSUMPTION_FIELDS,
    }
}

// ═══════════════════════════════════════════════════════════
// Prompt
// ═══════════════════════════════════════════════════════════

/// Prompt text plus the token → original mapping needed to restore it.
/// The mapping never leaves process memory; `Debug` redacts it.
pub struct AnonymizedPrompt {
    pub text: String,
    token_map: HashMap<String, String>,
}

impl AnonymizedPrompt {
    pub fn token_map(&self) -> &HashMap<String, String> {
        &self.token_map
    }

    pub fn token_count(&self) -> usize {
        self.token_map.len()
    }

    /// Build a prompt from parts. Intended for tests and adapters.
    pub fn from_parts(text: String, token_map: HashMap<String, String>) -> Self {
        Self { text, token_map }
    }
}

impl std::fmt::Debug for AnonymizedPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnonymizedPrompt")
            .field("text_len", &self.text.len())
            .field("token_map", &format_args!("<{} redacted>", self.token_map.len()))
            .finish()
    }
}

/// Builds anonymized prompts for one prompt variant.
pub struct Anonymizer {
    variant: PromptVariant,
    max_words: usize,
}

impl Anonymizer {
    pub fn new(variant: PromptVariant, max_words: usize) -> Self {
        Self { variant, max_words }
    }

    pub fn variant(&self) -> PromptVariant {
        self.variant
    }

    /// Anonymize `record` into a prompt. On any error nothing is returned;
    /// there is no partially-anonymized output.
    pub fn anonymize(
        &self,
        record: &HealthRecord,
        profile: Option<&UserProfile>,
        tokens: &mut dyn TokenSource,
    ) -> Result<AnonymizedPrompt, AnonymizationError> {
        let mut builder = PromptBuilder::new(tokens);
        let record_type = record.record_type();

        let mut data = Vec::new();
        for spec in field_specs(record_type) {
            let Some(value) = record.fields.get(spec.key) else {
                continue;
            };
            if let Some(line) = builder.render_field(spec, value)? {
                data.push(line);
            }
        }
        if data.is_empty() {
            data.push("- No measurements were provided.".to_string());
        }

        if self.variant == PromptVariant::Legacy {
            if let Some(profile) = profile {
                data.extend(builder.render_history(profile)?);
            }
        }

        let data_section = data.join("\n");
        builder.verify_no_token_leak(&data_section)?;

        let heading = match self.variant {
            PromptVariant::Anonymized => format!("Record type: {}", record_type.label()),
            PromptVariant::Legacy => format!("The patient has logged {}:", record_type.label()),
        };
        let text = format!(
            "{}\n{}\n{}\n\n{}",
            preamble(self.variant),
            heading,
            data_section,
            instruction_block(self.variant, self.max_words)
        );

        verify_no_identifier_leak(record, &text)?;

        Ok(AnonymizedPrompt {
            text,
            token_map: builder.token_map,
        })
    }
}

struct PromptBuilder<'a> {
    tokens: &'a mut dyn TokenSource,
    token_map: HashMap<String, String>,
}

impl<'a> PromptBuilder<'a> {
    fn new(tokens: &'a mut dyn TokenSource) -> Self {
        Self {
            tokens,
            token_map: HashMap::new(),
        }
    }

    fn render_field(&mut self, spec: &FieldSpec, value: &Value) -> Result<Option<String>, AnonymizationError> {
        match spec.kind {
            FieldKind::Number { unit } => {
                if matches!(value, Value::Object(_) | Value::Array(_)) {
                    return Err(AnonymizationError::UnexpectedShape {
                        field: spec.key.to_string(),
                    });
                }
                Ok(number_value(value).map(|n| {
                    let unit = if unit.is_empty() { String::new() } else { format!(" {unit}") };
                    format!("- {}: {}{}", spec.label, display_number(n), unit)
                }))
            }
            FieldKind::FreeText => {
                let texts = free_text_values(spec.key, value)?;
                if texts.is_empty() {
                    return Ok(None);
                }
                let mut rendered = Vec::with_capacity(texts.len());
                for original in texts {
                    rendered.push(self.tokenize(original)?);
                }
                Ok(Some(format!("- {}: {}", spec.label, rendered.join(", "))))
            }
        }
    }

    fn render_history(&mut self, profile: &UserProfile) -> Result<Vec<String>, AnonymizationError> {
        let mut lines = Vec::new();
        if profile.has_history() {
            lines.push(String::new());
            lines.push("Patient pregnancy history:".to_string());
            if let Some(g) = profile.gravida {
                lines.push(format!("- Gravida: {g}"));
            }
            if let Some(p) = profile.parity {
                lines.push(format!("- Parity: {p}"));
            }
        }
        if let Some(conditions) = profile.conditions() {
            let token = self.tokenize(conditions.to_string())?;
            lines.push(String::new());
            lines.push(format!("Pre-existing conditions: {token}"));
        }
        Ok(lines)
    }

    /// Replace one free-text instance with a fresh token.
    fn tokenize(&mut self, original: String) -> Result<String, AnonymizationError> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = self.tokens.next_token();
            let clashes = token.is_empty()
                || self.token_map.contains_key(&token)
                || self.token_map.values().any(|v| v.contains(&token))
                || original.contains(&token);
            if !clashes {
                self.token_map.insert(token.clone(), original);
                return Ok(token);
            }
        }
        Err(AnonymizationError::TokenCollision)
    }

    /// No tokenized original may appear as a word in the rendered data.
    fn verify_no_token_leak(&self, data_section: &str) -> Result<(), AnonymizationError> {
        for original in self.token_map.values() {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(original));
            let leaked = match Regex::new(&pattern) {
                Ok(re) => re.is_match(data_section),
                Err(_) => data_section.contains(original.as_str()),
            };
            if leaked {
                return Err(AnonymizationError::TokenLeak);
            }
        }
        Ok(())
    }
}

/// Free-text values for a field: a string or an array of strings.
/// Anything nested cannot be tokenized faithfully and is rejected.
fn free_text_values(key: &str, value: &Value) -> Result<Vec<String>, AnonymizationError> {
    let shape_error = || AnonymizationError::UnexpectedShape {
        field: key.to_string(),
    };
    let mut out = Vec::new();
    match value {
        Value::Null => {}
        Value::String(s) => push_non_empty(&mut out, s),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => push_non_empty(&mut out, s),
                    Value::Null => {}
                    _ => return Err(shape_error()),
                }
            }
        }
        _ => return Err(shape_error()),
    }
    Ok(out)
}

fn push_non_empty(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Fail if any direct identifier value from the record survives in `text`.
fn verify_no_identifier_leak(record: &HealthRecord, text: &str) -> Result<(), AnonymizationError> {
    static WHITESPACE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let haystack = text.to_lowercase();
    let mut candidates: Vec<(&str, String)> = DIRECT_IDENTIFIER_FIELDS
        .iter()
        .filter_map(|key| {
            let value = match record.fields.get(*key)? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((*key, value))
        })
        .collect();
    candidates.push(("user_id", record.user_id.clone()));

    for (field, value) in candidates {
        let needle = WHITESPACE.replace_all(value.trim(), " ").to_lowercase();
        if needle.chars().count() >= MIN_SCANNED_IDENTIFIER_LENGTH && haystack.contains(&needle) {
            return Err(AnonymizationError::IdentifierLeak {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    use super::*;
    use crate::models::TriggerEvent;

    /// Hands out a fixed sequence of tokens.
    struct ScriptedTokens {
        tokens: Vec<&'static str>,
        next: usize,
    }

    impl ScriptedTokens {
        fn new(tokens: Vec<&'static str>) -> Self {
            Self { tokens, next: 0 }
        }
    }

    impl TokenSource for ScriptedTokens {
        fn next_token(&mut self) -> String {
            let token = self.tokens[self.next % self.tokens.len()];
            self.next += 1;
            token.to_string()
        }
    }

    fn record(record_type: &str, fields: Value) -> HealthRecord {
        HealthRecord::from_event(&TriggerEvent::new(record_type, "rec-1", fields)).unwrap()
    }

    fn anonymizer() -> Anonymizer {
        Anonymizer::new(PromptVariant::Anonymized, 120)
    }

    // =================================================================
    // IDENTIFIERS
    // =================================================================

    #[test]
    fn identifiers_never_reach_prompt() {
        let rec = record(
            "vital_signs",
            json!({
                "user_id": "user-8842",
                "email": "jane.doe@example.com",
                "phone": "+1 555 0100",
                "patient_name": "Jane Doe",
                "systolic": 145,
                "diastolic": 85,
            }),
        );
        let mut tokens = RngTokenSource::new(StdRng::seed_from_u64(7));
        let prompt = anonymizer().anonymize(&rec, None, &mut tokens).unwrap();

        for leaked in ["user-8842", "jane.doe@example.com", "+1 555 0100", "Jane Doe"] {
            assert!(!prompt.text.contains(leaked), "prompt leaked {leaked}");
        }
        assert!(prompt.text.contains(PATIENT_PLACEHOLDER));
        assert!(prompt.text.contains("- Systolic blood pressure: 145 mmHg"));
        assert!(prompt.text.contains("- Diastolic blood pressure: 85 mmHg"));
    }

    #[test]
    fn unknown_fields_are_not_rendered() {
        let rec = record(
            "activity",
            json!({"user_id": "u-1", "steps": 4000, "insurance_id": "INS-99812", "notes": "walked to clinic"}),
        );
        let mut tokens = ScriptedTokens::new(vec!["ANONAAAAAAAA"]);
        let prompt = anonymizer().anonymize(&rec, None, &mut tokens).unwrap();
        assert!(!prompt.text.contains("INS-99812"));
        assert!(!prompt.text.contains("walked to clinic"));
        assert_eq!(prompt.token_count(), 0);
    }

    #[test]
    fn identifier_echoed_in_number_field_is_caught() {
        let rec = record("activity", json!({"user_id": "4000", "steps": 4000}));
        let mut tokens = ScriptedTokens::new(vec!["ANONAAAAAAAA"]);
        let err = anonymizer().anonymize(&rec, None, &mut tokens).unwrap_err();
        assert!(matches!(err, AnonymizationError::IdentifierLeak { ref field } if field == "user_id"));
    }

    // =================================================================
    // TOKENIZATION
    // =================================================================

    #[test]
    fn free_text_is_tokenized() {
        let rec = record(
            "symptoms",
            json!({"user_id": "u-1", "symptom": "nausea and headache"}),
        );
        let mut tokens = ScriptedTokens::new(vec!["ANONT1T1T1T1"]);
        let prompt = anonymizer().anonymize(&rec, None, &mut tokens).unwrap();

        assert!(!prompt.text.contains("nausea and headache"));
        assert!(prompt.text.contains("- Reported symptom: ANONT1T1T1T1"));
        assert_eq!(
            prompt.token_map().get("ANONT1T1T1T1").map(String::as_str),
            Some("nausea and headache")
        );
    }

    #[test]
    fn each_array_entry_gets_its_own_token() {
        let rec = record(
            "symptoms",
            json!({"user_id": "u-1", "symptoms": ["swelling", "blurred vision"]}),
        );
        let mut tokens = ScriptedTokens::new(vec!["ANONAAAAAAA1", "ANONAAAAAAA2"]);
        let prompt = anonymizer().anonymize(&rec, None, &mut tokens).unwrap();
        assert!(prompt.text.contains("- Reported symptoms: ANONAAAAAAA1, ANONAAAAAAA2"));
        assert_eq!(prompt.token_count(), 2);
    }

    #[test]
    fn rng_tokens_have_fixed_shape() {
        let mut tokens = RngTokenSource::new(StdRng::seed_from_u64(42));
        let a = tokens.next_token();
        let b = tokens.next_token();
        assert_eq!(a.len(), TOKEN_PREFIX.len() + TOKEN_BODY_LENGTH);
        assert!(a.starts_with(TOKEN_PREFIX));
        assert!(a[TOKEN_PREFIX.len()..].bytes().all(|c| TOKEN_ALPHABET.contains(&c)));
        assert_ne!(a, b);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let rec = record("consumption", json!({"user_id": "u-1", "stuff_consumed": "lentil soup"}));
        let mut first = RngTokenSource::new(StdRng::seed_from_u64(3));
        let mut second = RngTokenSource::new(StdRng::seed_from_u64(3));
        let a = anonymizer().anonymize(&rec, None, &mut first).unwrap();
        let b = anonymizer().anonymize(&rec, None, &mut second).unwrap();
        assert_eq!(a.text, b.text);
    }

    #[test]
    fn repeated_token_is_redrawn() {
        let rec = record(
            "symptoms",
            json!({"user_id": "u-1", "symptoms": ["swelling", "nausea"]}),
        );
        let mut tokens = ScriptedTokens::new(vec!["ANONSAMESAME", "ANONSAMESAME", "ANONOTHER222"]);
        let prompt = anonymizer().anonymize(&rec, None, &mut tokens).unwrap();
        assert_eq!(prompt.token_count(), 2);
        assert!(prompt.token_map().contains_key("ANONOTHER222"));
    }

    #[test]
    fn exhausted_token_source_fails() {
        let rec = record(
            "symptoms",
            json!({"user_id": "u-1", "symptoms": ["swelling", "nausea"]}),
        );
        let mut tokens = ScriptedTokens::new(vec!["ANONSAMESAME"]);
        let err = anonymizer().anonymize(&rec, None, &mut tokens).unwrap_err();
        assert!(matches!(err, AnonymizationError::TokenCollision));
    }

    #[test]
    fn free_text_equal_to_a_rendered_value_is_a_leak() {
        let rec = record(
            "symptoms",
            json!({"user_id": "u-1", "symptoms": ["Reported"]}),
        );
        let mut tokens = ScriptedTokens::new(vec!["ANONAAAAAAAA"]);
        let err = anonymizer().anonymize(&rec, None, &mut tokens).unwrap_err();
        assert!(matches!(err, AnonymizationError::TokenLeak));
    }

    // =================================================================
    // SHAPE
    // =================================================================

    #[test]
    fn nested_free_text_is_rejected() {
        let rec = record(
            "symptoms",
            json!({"user_id": "u-1", "symptoms": [{"text": "headache", "by": "Jane"}]}),
        );
        let mut tokens = ScriptedTokens::new(vec!["ANONAAAAAAAA"]);
        let err = anonymizer().anonymize(&rec, None, &mut tokens).unwrap_err();
        assert!(matches!(err, AnonymizationError::UnexpectedShape { ref field } if field == "symptoms"));
    }

    #[test]
    fn nested_number_field_is_rejected() {
        let rec = record("vital_signs", json!({"user_id": "u-1", "systolic": {"value": 150}}));
        let mut tokens = ScriptedTokens::new(vec!["ANONAAAAAAAA"]);
        assert!(anonymizer().anonymize(&rec, None, &mut tokens).is_err());
    }

    #[test]
    fn empty_record_still_builds_prompt() {
        let rec = record("temperature", json!({"user_id": "u-1"}));
        let mut tokens = ScriptedTokens::new(vec!["ANONAAAAAAAA"]);
        let prompt = anonymizer().anonymize(&rec, None, &mut tokens).unwrap();
        assert!(prompt.text.contains("No measurements were provided"));
    }

    // =================================================================
    // VARIANTS
    // =================================================================

    #[test]
    fn anonymized_variant_ignores_profile() {
        let rec = record("weight", json!({"user_id": "u-1", "change": 2.4}));
        let profile = UserProfile {
            gravida: Some(2),
            parity: Some(1),
            pre_existing_conditions: Some("chronic hypertension".into()),
        };
        let mut tokens = ScriptedTokens::new(vec!["ANONAAAAAAAA"]);
        let prompt = anonymizer().anonymize(&rec, Some(&profile), &mut tokens).unwrap();
        assert!(!prompt.text.contains("Gravida"));
        assert!(prompt.text.contains("- Weight change: 2.4 kg"));
        assert!(prompt.text.contains("Hard limit: 120 words."));
    }

    #[test]
    fn legacy_variant_adds_history_and_tokenizes_conditions() {
        let rec = record("weight", json!({"user_id": "u-1", "weight": 71}));
        let profile = UserProfile {
            gravida: Some(2),
            parity: Some(1),
            pre_existing_conditions: Some("chronic hypertension".into()),
        };
        let mut tokens = ScriptedTokens::new(vec!["ANONCOND0001"]);
        let prompt = Anonymizer::new(PromptVariant::Legacy, 120)
            .anonymize(&rec, Some(&profile), &mut tokens)
            .unwrap();
        assert!(prompt.text.contains("The patient has logged weight:"));
        assert!(prompt.text.contains("- Gravida: 2"));
        assert!(prompt.text.contains("- Parity: 1"));
        assert!(prompt.text.contains("Pre-existing conditions: ANONCOND0001"));
        assert!(!prompt.text.contains("chronic hypertension"));
    }

    #[test]
    fn debug_output_redacts_token_map() {
        let mut map = HashMap::new();
        map.insert("ANONAAAAAAAA".to_string(), "severe headache".to_string());
        let prompt = AnonymizedPrompt::from_parts("text".into(), map);
        let debug = format!("{prompt:?}");
        assert!(!debug.contains("severe headache"));
        assert!(debug.contains("1 redacted"));
    }
}
