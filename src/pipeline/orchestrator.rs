//! Per-record control flow.
//!
//! Rules and dietary advice are computed first. When the policy allows it,
//! the record is anonymized, sent to the external generator, cleaned and
//! de-anonymized; any failure on that path keeps the rule text. The
//! pipeline holds no mutable state and can be shared across threads.

use serde_json::Map;

use super::anonymize::{Anonymizer, RngTokenSource, TokenSource};
use super::client::{ExternalInsightClient, InsightGenerator};
use super::deanonymize::deanonymize;
use super::output::clean_generated_text;
use super::prompt::{system_prompt, PromptVariant};
use super::registry::Registry;
use super::rules::{self, Severity};
use super::sanitize::sanitize_fields_with_report;
use super::{dietary, PipelineError};
use crate::models::{
    HealthRecord, Insight, InsightKind, InsightSource, StoredInsight, TriggerEvent, UserProfile,
};
use crate::store::{InsightSink, ProfileStore};

/// Trust-boundary policy, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePolicy {
    /// Attempt external generation at all. Off by default.
    pub ai_enabled: bool,
    pub variant: PromptVariant,
    /// Response length cap sent with every request.
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            ai_enabled: false,
            variant: PromptVariant::Anonymized,
            max_tokens: 200,
            temperature: 0.2,
        }
    }
}

/// Insights computed for one record, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub clinical: Insight,
    pub dietary: Option<Insight>,
    pub severity: Severity,
}

/// Insights as written by the sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedOutcome {
    pub clinical: StoredInsight,
    pub dietary: Option<StoredInsight>,
    pub severity: Severity,
}

pub struct InsightPipeline {
    policy: PipelinePolicy,
    registry: Registry,
    anonymizer: Anonymizer,
    client: Option<ExternalInsightClient>,
}

impl InsightPipeline {
    pub fn new(
        policy: PipelinePolicy,
        registry: Registry,
        generator: Option<Box<dyn InsightGenerator + Send + Sync>>,
    ) -> Self {
        let anonymizer = Anonymizer::new(policy.variant, registry.max_insight_words);
        Self {
            policy,
            registry,
            anonymizer,
            client: generator.map(ExternalInsightClient::new),
        }
    }

    /// Rule-only pipeline with default thresholds.
    pub fn fallback_only() -> Self {
        Self::new(PipelinePolicy::default(), Registry::default(), None)
    }

    pub fn policy(&self) -> &PipelinePolicy {
        &self.policy
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compute the clinical and dietary insights for one trigger event.
    pub fn process(
        &self,
        event: &TriggerEvent,
        profiles: &dyn ProfileStore,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut tokens = RngTokenSource::new(rand::thread_rng());
        self.process_with_tokens(event, profiles, &mut tokens)
    }

    /// `process` with an injected token source.
    pub fn process_with_tokens(
        &self,
        event: &TriggerEvent,
        profiles: &dyn ProfileStore,
        tokens: &mut dyn TokenSource,
    ) -> Result<PipelineOutcome, PipelineError> {
        let record = HealthRecord::from_event(event).inspect_err(|e| {
            tracing::info!(
                record_id = %event.record_id,
                error_kind = e.kind(),
                "Trigger event skipped"
            );
        })?;
        let record_type = record.record_type();

        let finding = rules::evaluate(&record.measurement, &self.registry);
        let dietary_text = dietary::recommend(&record.measurement, &self.registry);

        let (sanitized, report) = sanitize_fields_with_report(&record.fields);
        if report.removed > 0 || report.truncated > 0 {
            tracing::debug!(
                record_id = %record.record_id,
                removed = report.removed,
                truncated = report.truncated,
                "Source data sanitized"
            );
        }

        let (clinical_text, source) = match self.external_text(&record, profiles, tokens) {
            Some((text, name)) => (text, InsightSource::External(name)),
            None if self.policy.ai_enabled => (finding.text.clone(), InsightSource::Fallback),
            None => (finding.text.clone(), InsightSource::Algorithm),
        };

        tracing::info!(
            record_id = %record.record_id,
            record_type = %record_type,
            source = %source,
            severity = finding.severity.as_str(),
            dietary = dietary_text.is_some(),
            "Insight generated"
        );

        let dietary = dietary_text.map(|text| {
            build_insight(&record, text.to_string(), sanitized.clone(), InsightSource::Algorithm, InsightKind::Dietary)
        });
        let clinical = build_insight(&record, clinical_text, sanitized, source, InsightKind::Clinical);

        Ok(PipelineOutcome {
            clinical,
            dietary,
            severity: finding.severity,
        })
    }

    /// Process, then write each insight once: clinical first, dietary second.
    /// Both writes are attempted even if the first fails.
    pub fn process_and_persist(
        &self,
        event: &TriggerEvent,
        profiles: &dyn ProfileStore,
        clinical_sink: &dyn InsightSink,
        dietary_sink: &dyn InsightSink,
    ) -> Result<PersistedOutcome, PipelineError> {
        let outcome = self.process(event, profiles)?;
        persist(outcome, &event.record_id, clinical_sink, dietary_sink)
    }

    /// External path. `None` means use the rule text.
    fn external_text(
        &self,
        record: &HealthRecord,
        profiles: &dyn ProfileStore,
        tokens: &mut dyn TokenSource,
    ) -> Option<(String, String)> {
        if !self.policy.ai_enabled {
            return None;
        }
        let Some(client) = &self.client else {
            tracing::warn!(record_id = %record.record_id, "AI enabled but no generator configured");
            return None;
        };

        let profile = self.load_profile(record, profiles);
        let prompt = match self.anonymizer.anonymize(record, profile.as_ref(), tokens) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    record_id = %record.record_id,
                    error_kind = e.kind(),
                    "Anonymization failed, skipping external generation"
                );
                return None;
            }
        };
        tracing::debug!(
            record_id = %record.record_id,
            tokens = prompt.token_count(),
            "Prompt anonymized"
        );

        let raw = client.generate(
            &prompt,
            system_prompt(self.policy.variant),
            self.policy.max_tokens,
            self.policy.temperature,
        )?;

        match clean_generated_text(&raw, self.registry.max_insight_words) {
            Ok(cleaned) => Some((deanonymize(&cleaned, &prompt), client.name().to_string())),
            Err(e) => {
                tracing::warn!(
                    record_id = %record.record_id,
                    error_kind = e.kind(),
                    "Generated text rejected"
                );
                None
            }
        }
    }

    /// Profile for the legacy prompt. Lookup failures count as no profile.
    fn load_profile(&self, record: &HealthRecord, profiles: &dyn ProfileStore) -> Option<UserProfile> {
        if self.policy.variant != PromptVariant::Legacy {
            return None;
        }
        match profiles.load_profile(&record.user_id) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(
                    record_id = %record.record_id,
                    error_kind = e.kind(),
                    "Profile lookup failed"
                );
                None
            }
        }
    }
}

fn build_insight(
    record: &HealthRecord,
    text: String,
    sanitized: Map<String, serde_json::Value>,
    source: InsightSource,
    kind: InsightKind,
) -> Insight {
    Insight {
        user_id: record.user_id.clone(),
        generated_text: text,
        source_collection: record.record_type(),
        source_record_id: record.record_id.clone(),
        sanitized_source_data: sanitized,
        source,
        kind,
    }
}

fn persist(
    outcome: PipelineOutcome,
    record_id: &str,
    clinical_sink: &dyn InsightSink,
    dietary_sink: &dyn InsightSink,
) -> Result<PersistedOutcome, PipelineError> {
    let clinical = clinical_sink.append(outcome.clinical).inspect_err(|e| {
        tracing::error!(record_id = %record_id, kind = "clinical", error_kind = e.kind(), "Insight write failed");
    });
    let dietary = outcome
        .dietary
        .map(|insight| {
            dietary_sink.append(insight).inspect_err(|e| {
                tracing::error!(record_id = %record_id, kind = "dietary", error_kind = e.kind(), "Insight write failed");
            })
        })
        .transpose();

    let clinical = clinical.map_err(|source| PipelineError::Persistence {
        kind: InsightKind::Clinical,
        source,
    })?;
    let dietary = dietary.map_err(|source| PipelineError::Persistence {
        kind: InsightKind::Dietary,
        source,
    })?;

    Ok(PersistedOutcome {
        clinical,
        dietary,
        severity: outcome.severity,
    })
}
