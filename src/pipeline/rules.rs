//! Deterministic clinical status sentences.
//!
//! One evaluator per record type. Every evaluator is total: missing
//! fields produce an INCOMPLETE DATA sentence, everything else is
//! classified into ordered bands, most severe band checked first.

use serde::{Deserialize, Serialize};

use super::registry::Registry;
use crate::models::{
    display_number, ActivityFields, ConsumptionFields, Measurement, SymptomFields,
    TemperatureFields, VitalSignsFields, WeightFields,
};

/// Clinical severity of a rule finding, least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Incomplete,
    Normal,
    Notice,
    Concern,
    Emergency,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Incomplete => "incomplete",
            Severity::Normal => "normal",
            Severity::Notice => "notice",
            Severity::Concern => "concern",
            Severity::Emergency => "emergency",
        }
    }
}

/// Status sentence plus the band it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFinding {
    pub severity: Severity,
    pub text: String,
}

impl RuleFinding {
    fn new(severity: Severity, text: String) -> Self {
        Self { severity, text }
    }

    fn incomplete(text: &str) -> Self {
        Self::new(Severity::Incomplete, text.to_string())
    }
}

pub const INCOMPLETE_ACTIVITY: &str =
    "INCOMPLETE DATA: Activity entry has no step count. Log your steps to track daily activity.";
pub const INCOMPLETE_VITAL_SIGNS: &str = "INCOMPLETE DATA: Blood pressure needs both systolic and diastolic values. \
     Re-measure and log both readings.";
pub const INCOMPLETE_WEIGHT: &str = "INCOMPLETE DATA: Weight entry has no weight or change value. \
     Log your current weight to track change.";
pub const INCOMPLETE_SYMPTOMS: &str = "INCOMPLETE DATA: Symptom entry is empty. \
     Describe what you are experiencing to enable monitoring.";
pub const INCOMPLETE_TEMPERATURE: &str =
    "INCOMPLETE DATA: Temperature entry has no reading. Log your temperature in °C.";
pub const INCOMPLETE_CONSUMPTION: &str =
    "INCOMPLETE DATA: Intake entry is empty. Log what you ate or drank.";

/// Evaluate a measurement into a status sentence. Never fails.
pub fn evaluate(measurement: &Measurement, registry: &Registry) -> RuleFinding {
    match measurement {
        Measurement::Activity(f) => evaluate_activity(f, registry),
        Measurement::VitalSigns(f) => evaluate_vital_signs(f, registry),
        Measurement::Weight(f) => evaluate_weight(f, registry),
        Measurement::Symptoms(f) => evaluate_symptoms(f, registry),
        Measurement::Temperature(f) => evaluate_temperature(f, registry),
        Measurement::Consumption(f) => evaluate_consumption(f, registry),
    }
}

// ═══════════════════════════════════════════
// Vital signs
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloodPressureBand {
    Normal,
    Concern,
    Emergency,
}

/// Emergency is tested before concern so it can never be shadowed.
pub fn classify_blood_pressure(registry: &Registry, systolic: f64, diastolic: f64) -> BloodPressureBand {
    let bands = &registry.blood_pressure;
    if systolic >= bands.emergency_systolic || diastolic >= bands.emergency_diastolic {
        BloodPressureBand::Emergency
    } else if systolic >= bands.concern_systolic || diastolic >= bands.concern_diastolic {
        BloodPressureBand::Concern
    } else {
        BloodPressureBand::Normal
    }
}

fn evaluate_vital_signs(f: &VitalSignsFields, registry: &Registry) -> RuleFinding {
    let (Some(sys), Some(dia)) = (f.systolic, f.diastolic) else {
        return RuleFinding::incomplete(INCOMPLETE_VITAL_SIGNS);
    };

    let reading = format!(
        "{}/{} mmHg{}",
        display_number(sys),
        display_number(dia),
        pulse_suffix(f.pulse, registry)
    );

    match classify_blood_pressure(registry, sys, dia) {
        BloodPressureBand::Emergency => RuleFinding::new(
            Severity::Emergency,
            format!(
                "BP STATUS: EMERGENCY RANGE. Reading: {reading}. Severe-range blood pressure in \
                 pregnancy needs same-day care: contact your provider or emergency services now."
            ),
        ),
        BloodPressureBand::Concern => RuleFinding::new(
            Severity::Concern,
            format!(
                "BP STATUS: ELEVATED. Reading: {reading}. Rest for 15 minutes and recheck; report \
                 persistent readings to your provider today, along with any headache or vision changes."
            ),
        ),
        BloodPressureBand::Normal => RuleFinding::new(
            Severity::Normal,
            format!("BP STATUS: NORMAL. Reading: {reading}. Continue routine monitoring."),
        ),
    }
}

fn pulse_suffix(pulse: Option<f64>, registry: &Registry) -> String {
    match pulse {
        Some(p) if p > registry.pulse.high => format!(", pulse {} bpm (HIGH)", display_number(p)),
        Some(p) if p < registry.pulse.low => format!(", pulse {} bpm (LOW)", display_number(p)),
        Some(p) => format!(", pulse {} bpm", display_number(p)),
        None => String::new(),
    }
}

// ═══════════════════════════════════════════
// Weight
// ═══════════════════════════════════════════

fn evaluate_weight(f: &WeightFields, registry: &Registry) -> RuleFinding {
    let mut context = String::new();
    if let Some(current) = f.current {
        context.push_str(&format!(", current {} kg", display_number(current)));
    }
    if let Some(bmi) = f.bmi {
        context.push_str(&format!(", BMI {}", display_number(bmi)));
    }

    let Some(change) = f.change else {
        return match f.current {
            Some(current) => RuleFinding::new(
                Severity::Normal,
                format!(
                    "WEIGHT STATUS: RECORDED. Current: {} kg{}. Log your next weigh-in to track change.",
                    display_number(current),
                    f.bmi
                        .map(|b| format!(", BMI {}", display_number(b)))
                        .unwrap_or_default()
                ),
            ),
            None => RuleFinding::incomplete(INCOMPLETE_WEIGHT),
        };
    };

    if change > registry.rapid_weight_gain_kg {
        RuleFinding::new(
            Severity::Concern,
            format!(
                "WEIGHT STATUS: RAPID GAIN. Change: +{} kg{context}. Sudden gain can reflect fluid \
                 retention; check hands, face and ankles for swelling and report this to your provider.",
                display_number(change)
            ),
        )
    } else if change > 0.0 {
        RuleFinding::new(
            Severity::Normal,
            format!(
                "WEIGHT STATUS: GAIN WITHIN RANGE. Change: +{} kg{context}. Continue regular weigh-ins.",
                display_number(change)
            ),
        )
    } else if change < 0.0 {
        RuleFinding::new(
            Severity::Notice,
            format!(
                "WEIGHT STATUS: LOSS. Change: {} kg{context}. Mention continued weight loss at your next visit.",
                display_number(change)
            ),
        )
    } else {
        RuleFinding::new(
            Severity::Normal,
            format!("WEIGHT STATUS: STABLE. Change: 0 kg{context}. Continue regular weigh-ins."),
        )
    }
}

// ═══════════════════════════════════════════
// Symptoms
// ═══════════════════════════════════════════

/// Intake logged on the same entry is evaluated as consumption and appended.
fn evaluate_symptoms(f: &SymptomFields, registry: &Registry) -> RuleFinding {
    let intake = (!f.intake.is_empty()).then(|| evaluate_consumption(&f.intake_fields(), registry));
    if f.reported.is_empty() {
        return intake.unwrap_or_else(|| RuleFinding::incomplete(INCOMPLETE_SYMPTOMS));
    }

    let finding = symptom_finding(&f.joined(), registry);
    match intake {
        Some(i) => RuleFinding::new(finding.severity.max(i.severity), format!("{} {}", finding.text, i.text)),
        None => finding,
    }
}

fn symptom_finding(reported: &str, registry: &Registry) -> RuleFinding {
    if registry.has_preeclampsia_indicator(reported) {
        RuleFinding::new(
            Severity::Concern,
            format!(
                "SYMPTOM STATUS: PREECLAMPSIA INDICATOR PRESENT. Reported: {reported}. Check your \
                 blood pressure now and contact your provider today."
            ),
        )
    } else {
        RuleFinding::new(
            Severity::Notice,
            format!(
                "SYMPTOM STATUS: NON-SPECIFIC FINDING. Reported: {reported}. Keep logging symptoms \
                 and mention them at your next visit."
            ),
        )
    }
}

// ═══════════════════════════════════════════
// Temperature
// ═══════════════════════════════════════════

fn evaluate_temperature(f: &TemperatureFields, registry: &Registry) -> RuleFinding {
    let Some(t) = f.celsius else {
        return RuleFinding::incomplete(INCOMPLETE_TEMPERATURE);
    };
    let bands = &registry.temperature;
    let reading = display_number(t);

    if t >= bands.fever {
        RuleFinding::new(
            Severity::Concern,
            format!(
                "TEMPERATURE STATUS: FEVER. Reading: {reading} °C. Contact your provider; fever in \
                 pregnancy should be assessed promptly."
            ),
        )
    } else if t >= bands.elevated {
        RuleFinding::new(
            Severity::Notice,
            format!("TEMPERATURE STATUS: ELEVATED. Reading: {reading} °C. Rest, hydrate and recheck in 4 hours."),
        )
    } else if t < bands.low {
        RuleFinding::new(
            Severity::Notice,
            format!(
                "TEMPERATURE STATUS: LOW. Reading: {reading} °C. Recheck with a reliable thermometer \
                 and contact your provider if it stays low."
            ),
        )
    } else {
        RuleFinding::new(
            Severity::Normal,
            format!("TEMPERATURE STATUS: NORMAL. Reading: {reading} °C. No action needed."),
        )
    }
}

// ═══════════════════════════════════════════
// Activity
// ═══════════════════════════════════════════

fn evaluate_activity(f: &ActivityFields, registry: &Registry) -> RuleFinding {
    let Some(steps) = f.steps.filter(|s| *s >= 0.0) else {
        return RuleFinding::incomplete(INCOMPLETE_ACTIVITY);
    };
    let calories = f
        .calories
        .map(|c| format!(", calories {}", display_number(c)))
        .unwrap_or_default();
    let count = display_number(steps);

    if steps < registry.activity.low_steps {
        RuleFinding::new(
            Severity::Notice,
            format!(
                "ACTIVITY STATUS: LOW. Steps: {count}{calories}. Short, gentle walks help circulation \
                 if your provider has not restricted activity."
            ),
        )
    } else if steps < registry.activity.active_steps {
        RuleFinding::new(
            Severity::Normal,
            format!("ACTIVITY STATUS: MODERATE. Steps: {count}{calories}. Keep up regular light activity."),
        )
    } else {
        RuleFinding::new(
            Severity::Normal,
            format!(
                "ACTIVITY STATUS: ACTIVE. Steps: {count}{calories}. Stay hydrated and stop if you feel \
                 dizzy or short of breath."
            ),
        )
    }
}

// ═══════════════════════════════════════════
// Consumption
// ═══════════════════════════════════════════

fn evaluate_consumption(f: &ConsumptionFields, registry: &Registry) -> RuleFinding {
    if f.items.is_empty() {
        return RuleFinding::incomplete(INCOMPLETE_CONSUMPTION);
    }
    let items = f.joined();
    let salty = registry.high_sodium_matches(&items);

    if salty.is_empty() {
        RuleFinding::new(
            Severity::Normal,
            format!("INTAKE STATUS: LOGGED. Items: {items}. Keep meals balanced and stay hydrated."),
        )
    } else {
        RuleFinding::new(
            Severity::Notice,
            format!(
                "INTAKE STATUS: HIGH-SODIUM ITEMS NOTED ({}). Items: {items}. Keep daily sodium moderate.",
                salty.join(", ")
            ),
        )
    }
}
