//! Nutrition-focused companion advice.
//!
//! Evaluated for every record, independently of how the clinical insight
//! is produced. Always algorithmic.

use super::registry::Registry;
use super::rules::{classify_blood_pressure, BloodPressureBand};
use crate::models::{ConsumptionFields, Measurement, SymptomFields, VitalSignsFields, WeightFields};

pub const BLOOD_PRESSURE_ADVICE: &str = "DIETARY RECOMMENDATION: Keep sodium under 2,300 mg per day, \
     favour potassium-rich foods such as bananas, beans and leafy greens, and drink water regularly.";
pub const WEIGHT_GAIN_ADVICE: &str = "DIETARY RECOMMENDATION: Build meals around vegetables, whole grains \
     and lean protein, and cut back on salty processed foods that promote fluid retention.";
pub const WEIGHT_LOSS_ADVICE: &str = "DIETARY RECOMMENDATION: Eat regular meals and snacks with enough \
     protein and healthy fats to support steady pregnancy weight gain.";
pub const HEADACHE_ADVICE: &str = "DIETARY RECOMMENDATION: Stay well hydrated, avoid skipping meals, \
     and limit caffeine and salty snacks while headaches persist.";
pub const SWELLING_ADVICE: &str = "DIETARY RECOMMENDATION: Reduce added salt and processed foods, \
     drink water steadily through the day, and include protein at every meal.";
pub const NAUSEA_ADVICE: &str = "DIETARY RECOMMENDATION: Try small, frequent, bland meals, sip fluids \
     between meals, and keep plain crackers at hand.";
pub const HIGH_SODIUM_INTAKE_ADVICE: &str = "DIETARY RECOMMENDATION: Balance salty items with fresh \
     fruit and vegetables, choose low-sodium alternatives, and drink extra water today.";
pub const GENERAL_INTAKE_ADVICE: &str = "DIETARY RECOMMENDATION: Aim for balanced plates with vegetables, \
     whole grains, lean protein and calcium-rich foods, and keep fluids up.";

/// Dietary recommendation for a measurement, if its values warrant one.
pub fn recommend(measurement: &Measurement, registry: &Registry) -> Option<&'static str> {
    if !is_eligible(measurement, registry) {
        return None;
    }
    Some(match measurement {
        Measurement::VitalSigns(_) => BLOOD_PRESSURE_ADVICE,
        Measurement::Weight(f) => weight_advice(f),
        Measurement::Symptoms(f) => symptom_advice(f, registry),
        Measurement::Consumption(f) => intake_advice(f, registry),
        Measurement::Activity(_) | Measurement::Temperature(_) => return None,
    })
}

/// Per-type eligibility predicate.
pub fn is_eligible(measurement: &Measurement, registry: &Registry) -> bool {
    match measurement {
        Measurement::VitalSigns(f) => vitals_eligible(f, registry),
        Measurement::Weight(f) => f
            .change
            .is_some_and(|c| c.abs() > registry.dietary_weight_change_kg),
        Measurement::Symptoms(f) => has_dietary_symptom(f, registry) || !f.intake.is_empty(),
        Measurement::Consumption(f) => !f.items.is_empty(),
        Measurement::Activity(_) | Measurement::Temperature(_) => false,
    }
}

fn vitals_eligible(f: &VitalSignsFields, registry: &Registry) -> bool {
    match (f.systolic, f.diastolic) {
        (Some(sys), Some(dia)) => classify_blood_pressure(registry, sys, dia) != BloodPressureBand::Normal,
        // A single reading at or above the concern band still counts.
        (Some(sys), None) => sys >= registry.blood_pressure.concern_systolic,
        (None, Some(dia)) => dia >= registry.blood_pressure.concern_diastolic,
        (None, None) => false,
    }
}

fn weight_advice(f: &WeightFields) -> &'static str {
    match f.change {
        Some(c) if c < 0.0 => WEIGHT_LOSS_ADVICE,
        _ => WEIGHT_GAIN_ADVICE,
    }
}

fn has_dietary_symptom(f: &SymptomFields, registry: &Registry) -> bool {
    !f.reported.is_empty() && registry.has_dietary_symptom(&f.joined())
}

/// Headache takes precedence over swelling, swelling over nausea. Entries
/// with only intake get the intake advice.
fn symptom_advice(f: &SymptomFields, registry: &Registry) -> &'static str {
    if !has_dietary_symptom(f, registry) {
        return intake_advice(&f.intake_fields(), registry);
    }
    let text = f.joined();
    if registry.has_headache_symptom(&text) {
        HEADACHE_ADVICE
    } else if registry.has_swelling_symptom(&text) {
        SWELLING_ADVICE
    } else {
        NAUSEA_ADVICE
    }
}

fn intake_advice(f: &ConsumptionFields, registry: &Registry) -> &'static str {
    if registry.high_sodium_matches(&f.joined()).is_empty() {
        GENERAL_INTAKE_ADVICE
    } else {
        HIGH_SODIUM_INTAKE_ADVICE
    }
}
