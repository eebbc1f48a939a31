pub mod anonymize;
pub mod client;
pub mod deanonymize;
pub mod dietary;
pub mod orchestrator;
pub mod output;
pub mod prompt;
pub mod registry;
pub mod rules;
pub mod sanitize;

pub use anonymize::{AnonymizedPrompt, Anonymizer, RngTokenSource, TokenSource};
pub use client::{ExternalInsightClient, GenerationRequest, InsightGenerator, MockInsightGenerator, OpenAiClient};
pub use orchestrator::{InsightPipeline, PersistedOutcome, PipelineOutcome, PipelinePolicy};
pub use prompt::PromptVariant;
pub use registry::Registry;
pub use rules::{RuleFinding, Severity};

use thiserror::Error;

use crate::models::{InsightKind, RecordError};
use crate::store::StoreError;

/// Redaction could not be completed safely. Always degrades to fallback.
#[derive(Error, Debug)]
pub enum AnonymizationError {
    #[error("Field {field} has a shape that cannot be redacted")]
    UnexpectedShape { field: String },

    #[error("Token source produced colliding tokens")]
    TokenCollision,

    #[error("Tokenized text survived in prompt")]
    TokenLeak,

    #[error("Identifier field {field} survived in prompt")]
    IdentifierLeak { field: String },
}

impl AnonymizationError {
    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnexpectedShape { .. } => "unexpected_shape",
            Self::TokenCollision => "token_collision",
            Self::TokenLeak => "token_leak",
            Self::IdentifierLeak { .. } => "identifier_leak",
        }
    }
}

/// External generation failed. Always degrades to fallback.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No API credential configured")]
    MissingCredential,

    #[error("Cannot reach generation service at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Generation service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response: {0}")]
    ResponseParsing(String),

    #[error("Response was empty after cleanup")]
    EmptyResponse,
}

impl GenerationError {
    /// Stable label for logs. Never includes response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Connection(_) => "connection",
            Self::Timeout(_) => "timeout",
            Self::HttpClient(_) => "http_client",
            Self::Api { .. } => "api_status",
            Self::ResponseParsing(_) => "response_parsing",
            Self::EmptyResponse => "empty_response",
        }
    }
}

/// Caller-visible pipeline failures.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Record rejected: {0}")]
    Record(#[from] RecordError),

    #[error("Failed to persist {kind} insight: {source}")]
    Persistence {
        kind: InsightKind,
        #[source]
        source: StoreError,
    },
}
