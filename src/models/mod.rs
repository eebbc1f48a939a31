pub mod enums;
pub mod insight;
pub mod profile;
pub mod record;

pub use enums::*;
pub use insight::*;
pub use profile::*;
pub use record::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Unsupported record type: {0}")]
    UnsupportedRecordType(String),

    #[error("Record is missing user_id")]
    MissingUserId,

    #[error("Record identifier is empty")]
    MissingRecordId,
}

impl RecordError {
    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEnum { .. } => "invalid_enum",
            Self::UnsupportedRecordType(_) => "unsupported_record_type",
            Self::MissingUserId => "missing_user_id",
            Self::MissingRecordId => "missing_record_id",
        }
    }
}
