use serde::{Deserialize, Serialize};

/// Pregnancy history kept on the user document. Every field is optional;
/// an absent profile is equivalent to `UserProfile::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub gravida: Option<u32>,
    #[serde(default)]
    pub parity: Option<u32>,
    #[serde(default)]
    pub pre_existing_conditions: Option<String>,
}

impl UserProfile {
    pub fn has_history(&self) -> bool {
        self.gravida.is_some() || self.parity.is_some()
    }

    /// Conditions text, if present and non-blank.
    pub fn conditions(&self) -> Option<&str> {
        self.pre_existing_conditions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
