use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::{PipelinePolicy, PromptVariant};

/// Application-level constants
pub const APP_NAME: &str = "preeclampsia-insights";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "preeclampsia_insights=info,warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Cannot determine a data directory; set INSIGHTS_DATA_DIR")]
    NoDataDir,
}

/// Runtime configuration. `Default` is the fallback-only setup.
#[derive(Clone, PartialEq)]
pub struct InsightConfig {
    pub ai_enabled: bool,
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub prompt_variant: PromptVariant,
    /// `None` resolves to the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            ai_enabled: false,
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            prompt_variant: PromptVariant::default(),
            data_dir: None,
        }
    }
}

impl std::fmt::Debug for InsightConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightConfig")
            .field("ai_enabled", &self.ai_enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("prompt_variant", &self.prompt_variant)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl InsightConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get("INSIGHTS_AI_ENABLED") {
            config.ai_enabled = parse_bool("INSIGHTS_AI_ENABLED", &v)?;
        }
        config.api_key = get("OPENAI_API_KEY");
        if let Some(v) = get("INSIGHTS_API_BASE_URL") {
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: "INSIGHTS_API_BASE_URL",
                    value: v,
                });
            }
            config.api_base_url = v;
        }
        if let Some(v) = get("INSIGHTS_MODEL") {
            config.model = v;
        }
        if let Some(v) = get("INSIGHTS_MAX_TOKENS") {
            config.max_tokens = parse_positive("INSIGHTS_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("INSIGHTS_TEMPERATURE") {
            config.temperature = v
                .parse::<f32>()
                .ok()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or(ConfigError::InvalidValue {
                    key: "INSIGHTS_TEMPERATURE",
                    value: v,
                })?;
        }
        if let Some(v) = get("INSIGHTS_TIMEOUT_SECS") {
            config.timeout_secs = parse_positive("INSIGHTS_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("INSIGHTS_PROMPT_VARIANT") {
            config.prompt_variant = PromptVariant::parse(&v).ok_or(ConfigError::InvalidValue {
                key: "INSIGHTS_PROMPT_VARIANT",
                value: v,
            })?;
        }
        config.data_dir = get("INSIGHTS_DATA_DIR").map(PathBuf::from);

        Ok(config)
    }

    /// Pipeline policy derived from this configuration.
    pub fn policy(&self) -> PipelinePolicy {
        PipelinePolicy {
            ai_enabled: self.ai_enabled,
            variant: self.prompt_variant,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Data directory: explicit setting, else `<platform data dir>/preeclampsia-insights`.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join(APP_NAME))
                .ok_or(ConfigError::NoDataDir),
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value
        .parse::<T>()
        .ok()
        .filter(|n| *n > T::default())
        .ok_or_else(|| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
