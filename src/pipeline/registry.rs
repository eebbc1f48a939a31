//! Clinical cut-points and symptom vocabulary.
//!
//! Pure data. Rules and dietary advice read every threshold from a
//! `Registry`, so guideline- or locale-specific values are swapped by
//! constructing a different registry, never by editing rule logic.

use serde::{Deserialize, Serialize};

/// Symptom phrases associated with preeclampsia (case-insensitive substrings).
pub const PREECLAMPSIA_SYMPTOMS: &[&str] = &[
    "headache",
    "vision",
    "blur",
    "seeing spots",
    "abdominal pain",
    "nausea",
    "vomiting",
    "shortness of breath",
    "swelling",
    "edema",
    "oedema",
];

/// Symptom subset that also warrants dietary advice.
pub const DIETARY_SYMPTOMS: &[&str] = &["swelling", "edema", "oedema", "headache", "nausea"];

/// Dietary symptoms that select the headache advice.
pub const HEADACHE_SYMPTOMS: &[&str] = &["headache"];

/// Dietary symptoms that select the swelling advice.
pub const SWELLING_SYMPTOMS: &[&str] = &["swelling", "edema", "oedema"];

/// Intake keywords that suggest a high-sodium entry.
pub const HIGH_SODIUM_FOODS: &[&str] = &[
    "chips",
    "crisps",
    "fries",
    "salt",
    "pickle",
    "bacon",
    "sausage",
    "ramen",
    "instant noodle",
    "soy sauce",
    "pizza",
    "fast food",
    "processed",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureBands {
    pub concern_systolic: f64,
    pub concern_diastolic: f64,
    pub emergency_systolic: f64,
    pub emergency_diastolic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseBands {
    /// Below this is reported as low (bpm).
    pub low: f64,
    /// Above this is reported as high (bpm).
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBands {
    pub fever: f64,
    pub elevated: f64,
    pub low: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityBands {
    pub low_steps: f64,
    pub active_steps: f64,
}

/// Full threshold and vocabulary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    pub blood_pressure: BloodPressureBands,
    /// Weight change above this (kg, per reporting interval) is rapid gain.
    pub rapid_weight_gain_kg: f64,
    /// Absolute weight change above this (kg) triggers dietary advice.
    pub dietary_weight_change_kg: f64,
    pub pulse: PulseBands,
    pub temperature: TemperatureBands,
    pub activity: ActivityBands,
    pub preeclampsia_symptoms: Vec<String>,
    pub dietary_symptoms: Vec<String>,
    /// Checked before `swelling_symptoms`; other dietary symptoms get nausea advice.
    pub headache_symptoms: Vec<String>,
    pub swelling_symptoms: Vec<String>,
    pub high_sodium_foods: Vec<String>,
    /// Hard cap on generated insight length, in words.
    pub max_insight_words: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            blood_pressure: BloodPressureBands {
                concern_systolic: 140.0,
                concern_diastolic: 90.0,
                emergency_systolic: 160.0,
                emergency_diastolic: 110.0,
            },
            rapid_weight_gain_kg: 2.0,
            dietary_weight_change_kg: 1.0,
            pulse: PulseBands {
                low: 50.0,
                high: 110.0,
            },
            temperature: TemperatureBands {
                fever: 38.0,
                elevated: 37.5,
                low: 35.0,
            },
            activity: ActivityBands {
                low_steps: 3_000.0,
                active_steps: 8_000.0,
            },
            preeclampsia_symptoms: to_owned(PREECLAMPSIA_SYMPTOMS),
            dietary_symptoms: to_owned(DIETARY_SYMPTOMS),
            headache_symptoms: to_owned(HEADACHE_SYMPTOMS),
            swelling_symptoms: to_owned(SWELLING_SYMPTOMS),
            high_sodium_foods: to_owned(HIGH_SODIUM_FOODS),
            max_insight_words: 120,
        }
    }
}

impl Registry {
    /// Preeclampsia phrases found in `text`, in registry order.
    pub fn preeclampsia_matches(&self, text: &str) -> Vec<&str> {
        matches_in(&self.preeclampsia_symptoms, text)
    }

    pub fn has_preeclampsia_indicator(&self, text: &str) -> bool {
        !self.preeclampsia_matches(text).is_empty()
    }

    pub fn has_dietary_symptom(&self, text: &str) -> bool {
        !matches_in(&self.dietary_symptoms, text).is_empty()
    }

    pub fn has_headache_symptom(&self, text: &str) -> bool {
        !matches_in(&self.headache_symptoms, text).is_empty()
    }

    pub fn has_swelling_symptom(&self, text: &str) -> bool {
        !matches_in(&self.swelling_symptoms, text).is_empty()
    }

    pub fn high_sodium_matches(&self, text: &str) -> Vec<&str> {
        matches_in(&self.high_sodium_foods, text)
    }
}

fn to_owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn matches_in<'a>(phrases: &'a [String], text: &str) -> Vec<&'a str> {
    let lower = text.to_lowercase();
    phrases
        .iter()
        .filter(|p| lower.contains(&p.to_lowercase()))
        .map(String::as_str)
        .collect()
}
