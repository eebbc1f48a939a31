use serde::{Deserialize, Serialize};

use super::anonymize::PATIENT_PLACEHOLDER;

/// Which prompt shape is sent to the external generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    /// Status-first clinical note built from the record alone.
    #[default]
    Anonymized,
    /// Supportive, educational note enriched with pregnancy history.
    Legacy,
}

impl PromptVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptVariant::Anonymized => "anonymized",
            PromptVariant::Legacy => "legacy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anonymized" => Some(PromptVariant::Anonymized),
            "legacy" => Some(PromptVariant::Legacy),
            _ => None,
        }
    }
}

pub const CLINICAL_SYSTEM_PROMPT: &str = "You are a clinical decision-support assistant for \
     preeclampsia surveillance. Write terse, status-first notes for a pregnant patient. Do not \
     diagnose. Never invent measurements. Opaque tokens stand for patient-reported text; copy them \
     verbatim and do not guess their meaning.";

pub const LEGACY_SYSTEM_PROMPT: &str = "You are a supportive health assistant specializing in \
     preeclampsia monitoring during pregnancy. Provide encouraging, evidence-based insights without \
     giving clinical diagnosis. Opaque tokens stand for patient-reported text; copy them verbatim.";

pub fn system_prompt(variant: PromptVariant) -> &'static str {
    match variant {
        PromptVariant::Anonymized => CLINICAL_SYSTEM_PROMPT,
        PromptVariant::Legacy => LEGACY_SYSTEM_PROMPT,
    }
}

/// Opening line of every prompt. References the patient only by placeholder.
pub fn preamble(variant: PromptVariant) -> String {
    match variant {
        PromptVariant::Anonymized => format!(
            "Patient {PATIENT_PLACEHOLDER} is under preeclampsia surveillance during pregnancy."
        ),
        PromptVariant::Legacy => "You are monitoring a pregnant patient for preeclampsia risk.".to_string(),
    }
}

/// Fixed instruction block appended after the record data.
pub fn instruction_block(variant: PromptVariant, max_words: usize) -> String {
    match variant {
        PromptVariant::Anonymized => format!(
            "INSTRUCTIONS:\n\
             1. First line: a status indicator in the form \"<AREA> STATUS: <LEVEL>\".\n\
             2. Restate the measurements exactly as given, with units.\n\
             3. List concrete action items for the patient.\n\
             4. No greetings, pleasantries or sign-offs.\n\
             5. Hard limit: {max_words} words."
        ),
        PromptVariant::Legacy => format!(
            "Based on this information, provide a personalized health insight focusing on \
             preeclampsia monitoring and management. Address relevant factors such as blood \
             pressure, weight trends and any reported symptoms. Be supportive and educational, \
             not alarming. Keep under {max_words} words. Avoid clinical diagnosis or treatment advice."
        ),
    }
}
