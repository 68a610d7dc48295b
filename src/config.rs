//! Configuration management
//!
//! Settings load from environment variables with sensible defaults and can be
//! overridden per invocation by CLI flags.
//!
//! # Environment Variables
//!
//! - `BUILDMEND_PROVIDER`: LLM provider (ollama|openai|claude|gemini|grok|groq) - default: "ollama"
//! - `BUILDMEND_MODEL`: model name - default: provider-specific
//! - `BUILDMEND_MAX_ATTEMPTS`: remediated retries after the initial build - default: "3"
//! - `BUILDMEND_COMMAND_TIMEOUT`: per-command timeout in seconds - default: "600"
//! - `BUILDMEND_MAX_OUTPUT_BYTES`: per-stream capture cap - default: "262144"
//! - `BUILDMEND_MAX_ERROR_LEN`: character cap on error logs sent to the LLM - default: "10000"
//! - `BUILDMEND_REQUEST_TIMEOUT`: LLM request timeout in seconds - default: "120"
//! - `BUILDMEND_WEBHOOK_URL`: report delivery URL - default: unset (no webhook)
//! - `BUILDMEND_TOOL_VERSION`: toolchain version override for planned commands - default: unset
//! - `BUILDMEND_LOG_LEVEL`: logging level - default: "info"
//!
//! Provider credentials are read directly by the genai library
//! (`OLLAMA_HOST`, `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GOOGLE_API_KEY`,
//! `XAI_API_KEY`, `GROQ_API_KEY`).

use crate::ai::{GenAIBackend, Provider};
use crate::pipeline::PipelineSettings;
use crate::plan::PlanOverrides;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MAX_OUTPUT_BYTES: usize = 262_144;
const DEFAULT_MAX_ERROR_LEN: usize = 10_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: ollama, openai, claude, gemini, grok, groq")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// All settings for one invocation.
///
/// [`MendConfig::from_env`] loads from `BUILDMEND_*` environment variables
/// with fallback defaults; CLI flags overwrite individual fields afterwards.
#[derive(Debug, Clone)]
pub struct MendConfig {
    /// LLM provider for remediation
    pub provider: Provider,

    /// Model name (provider-specific)
    pub model: String,

    /// Remediated retries permitted after the initial build
    pub max_attempts: u32,

    /// Hard wall-clock timeout per external command, in seconds
    pub command_timeout_secs: u64,

    /// Per-stream output capture cap in bytes
    pub max_output_bytes: usize,

    /// Character cap on the error log sent to the LLM
    pub max_error_len: usize,

    /// LLM request timeout in seconds
    pub request_timeout_secs: u64,

    /// Webhook URL for run reports, if any
    pub webhook_url: Option<String>,

    /// Toolchain version override applied to planned commands
    pub tool_version: Option<String>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Reads and parses a numeric environment variable, keeping the default
/// when the variable is unset.
fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::ParseError {
            field: key.to_string(),
            error: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

impl MendConfig {
    /// Loads configuration from `BUILDMEND_*` environment variables.
    ///
    /// A variable that is set but unparseable is an error rather than a
    /// silent fallback; a misconfigured run should stop before it executes
    /// anything.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match env::var("BUILDMEND_PROVIDER") {
            Ok(raw) => raw
                .parse::<Provider>()
                .map_err(|_| ConfigError::InvalidProvider(raw))?,
            Err(_) => Provider::Ollama,
        };

        let model = env::var("BUILDMEND_MODEL")
            .ok()
            .unwrap_or_else(|| provider.default_model().to_string());

        let max_attempts = env_parse("BUILDMEND_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        let command_timeout_secs =
            env_parse("BUILDMEND_COMMAND_TIMEOUT", DEFAULT_COMMAND_TIMEOUT_SECS)?;
        let max_output_bytes = env_parse("BUILDMEND_MAX_OUTPUT_BYTES", DEFAULT_MAX_OUTPUT_BYTES)?;
        let max_error_len = env_parse("BUILDMEND_MAX_ERROR_LEN", DEFAULT_MAX_ERROR_LEN)?;
        let request_timeout_secs =
            env_parse("BUILDMEND_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        let webhook_url = env::var("BUILDMEND_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let tool_version = env::var("BUILDMEND_TOOL_VERSION")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let log_level = env::var("BUILDMEND_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Ok(Self {
            provider,
            model,
            max_attempts,
            command_timeout_secs,
            max_output_bytes,
            max_error_len,
            request_timeout_secs,
            webhook_url,
            tool_version,
            log_level,
        })
    }

    /// Validates field ranges. Provider credentials are checked lazily by
    /// genai when the first request goes out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Command timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.max_attempts > 20 {
            return Err(ConfigError::ValidationFailed(
                "Max attempts cannot exceed 20".to_string(),
            ));
        }
        if self.max_output_bytes < 1024 {
            return Err(ConfigError::ValidationFailed(
                "Max output bytes must be at least 1KB".to_string(),
            ));
        }
        if self.max_error_len < 100 {
            return Err(ConfigError::ValidationFailed(
                "Max error length must be at least 100 characters".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Instantiates the configured LLM backend.
    pub fn create_backend(&self) -> Arc<GenAIBackend> {
        Arc::new(GenAIBackend::with_config(
            self.provider,
            self.model.clone(),
            Some(Duration::from_secs(self.request_timeout_secs)),
        ))
    }

    /// Derives the pipeline settings this configuration describes.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_attempts: self.max_attempts,
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            max_output_bytes: self.max_output_bytes,
            max_error_len: self.max_error_len,
            overrides: PlanOverrides {
                tool_version: self.tool_version.clone(),
            },
        }
    }
}

impl fmt::Display for MendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Buildmend Configuration:")?;
        writeln!(f, "  Provider: {}", self.provider.name())?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  Max Attempts: {}", self.max_attempts)?;
        writeln!(f, "  Command Timeout: {}s", self.command_timeout_secs)?;
        writeln!(f, "  Max Output: {} bytes", self.max_output_bytes)?;
        writeln!(f, "  Max Error Length: {} chars", self.max_error_len)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        if let Some(url) = &self.webhook_url {
            writeln!(f, "  Webhook: {}", url)?;
        }
        if let Some(version) = &self.tool_version {
            writeln!(f, "  Tool Version Override: {}", version)?;
        }
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
