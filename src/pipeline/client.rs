use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::anonymize::AnonymizedPrompt;
use super::GenerationError;

/// One text-generation request. Carries only anonymized text.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Remote text-generation abstraction (allows mocking)
pub trait InsightGenerator {
    /// Service name recorded as the insight source.
    fn name(&self) -> &str;

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError>;
}

// ═══════════════════════════════════════════════════════════
// OpenAI-compatible HTTP client
// ═══════════════════════════════════════════════════════════

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl InsightGenerator for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingCredential)?;

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    GenerationError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::ResponseParsing("response has no message content".into()))
    }
}

// ═══════════════════════════════════════════════════════════
// Failure-absorbing wrapper
// ═══════════════════════════════════════════════════════════

/// Wraps a generator so every failure becomes `None`.
pub struct ExternalInsightClient {
    generator: Box<dyn InsightGenerator + Send + Sync>,
}

impl ExternalInsightClient {
    pub fn new(generator: Box<dyn InsightGenerator + Send + Sync>) -> Self {
        Self { generator }
    }

    pub fn name(&self) -> &str {
        self.generator.name()
    }

    /// One attempt, no retry. Errors are logged by kind only.
    pub fn generate(
        &self,
        prompt: &AnonymizedPrompt,
        system: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Option<String> {
        let request = GenerationRequest {
            system,
            prompt: &prompt.text,
            max_tokens,
            temperature,
        };
        match self.generator.generate(&request) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(
                    service = self.generator.name(),
                    error_kind = e.kind(),
                    "External generation failed"
                );
                None
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Mock
// ═══════════════════════════════════════════════════════════

/// Mock generator for testing: fixed response or fixed failure.
pub struct MockInsightGenerator {
    name: String,
    response: Option<String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockInsightGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            name: "mock".to_string(),
            response: Some(response.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// A generator whose every call fails as unreachable.
    pub fn failing() -> Self {
        Self {
            response: None,
            ..Self::new("")
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

impl InsightGenerator for MockInsightGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(request.prompt.to_string());
        }
        self.response
            .clone()
            .ok_or_else(|| GenerationError::Connection("mock".into()))
    }
}

/// Lets a shared mock be handed to the pipeline while the test keeps a handle.
impl<T: InsightGenerator + ?Sized> InsightGenerator for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        (**self).generate(request)
    }
}
