use serde::{Deserialize, Serialize};

use super::RecordError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = RecordError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(RecordError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(RecordType {
    Activity => "activity",
    VitalSigns => "vital_signs",
    Weight => "weight",
    Symptoms => "symptoms",
    Temperature => "temperature",
    Consumption => "consumption",
});

str_enum!(InsightKind {
    Clinical => "clinical",
    Dietary => "dietary",
});

impl RecordType {
    pub const ALL: [RecordType; 6] = [
        RecordType::Activity,
        RecordType::VitalSigns,
        RecordType::Weight,
        RecordType::Symptoms,
        RecordType::Temperature,
        RecordType::Consumption,
    ];

    /// Resolve a trigger collection name, accepting the legacy `day` log.
    pub fn from_collection(name: &str) -> Result<Self, RecordError> {
        match name {
            "day" => Ok(RecordType::Symptoms),
            other => other
                .parse()
                .map_err(|_| RecordError::UnsupportedRecordType(other.to_string())),
        }
    }

    /// Human-readable label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            RecordType::Activity => "activity",
            RecordType::VitalSigns => "vital signs",
            RecordType::Weight => "weight",
            RecordType::Symptoms => "symptoms",
            RecordType::Temperature => "temperature",
            RecordType::Consumption => "dietary intake",
        }
    }
}
