//! GenAI multi-provider LLM client
//!
//! Unified interface to multiple LLM providers through the `genai` crate:
//! Ollama, OpenAI, Anthropic Claude, Google Gemini, xAI Grok, and Groq all
//! speak the same [`FixBackend`] contract here. Provider credentials and
//! endpoints come from genai's own environment variables (`OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`, `OLLAMA_HOST`, ...).

use crate::ai::backend::{BackendError, FixBackend};
use crate::remedy::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::remedy::response::parse_fix_response;
use crate::remedy::types::{FixRequest, FixResponse};
use async_trait::async_trait;
use clap::ValueEnum;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use genai::Client;
use std::time::Duration;
use tracing::{debug, error, info};

/// Supported LLM providers
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Ollama local inference
    Ollama,
    /// OpenAI GPT models
    OpenAI,
    /// Anthropic Claude
    Claude,
    /// Google Gemini
    Gemini,
    /// xAI Grok
    Grok,
    /// Groq
    Groq,
}

impl Provider {
    /// Returns the provider prefix for genai model strings
    fn prefix(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAI => "openai",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
            Provider::Grok => "grok",
            Provider::Groq => "groq",
        }
    }

    /// Returns the provider name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama => "Ollama",
            Provider::OpenAI => "OpenAI",
            Provider::Claude => "Claude",
            Provider::Gemini => "Gemini",
            Provider::Grok => "Grok",
            Provider::Groq => "Groq",
        }
    }

    /// Default model for the provider when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Ollama => "qwen2.5-coder:7b",
            Provider::OpenAI => "gpt-4o",
            Provider::Claude => "claude-sonnet-4-5-20250929",
            Provider::Gemini => "gemini-2.0-flash",
            Provider::Grok => "grok-2",
            Provider::Groq => "llama-3.3-70b-versatile",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAI),
            "claude" => Ok(Provider::Claude),
            "gemini" => Ok(Provider::Gemini),
            "grok" => Ok(Provider::Grok),
            "groq" => Ok(Provider::Groq),
            other => Err(format!(
                "invalid provider '{}' (valid: ollama, openai, claude, gemini, grok, groq)",
                other
            )),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// GenAI-based fix backend supporting multiple providers
///
/// Thread-safe; share across tasks with `Arc`.
pub struct GenAIBackend {
    client: Client,

    /// Full model identifier (e.g., "ollama:qwen2.5-coder:7b")
    model: String,

    provider: Provider,

    /// Request timeout
    timeout: Duration,
}

impl GenAIBackend {
    /// Creates a backend for `provider` with the provider's default model.
    pub fn new(provider: Provider) -> Self {
        Self::with_config(provider, provider.default_model().to_string(), None)
    }

    /// Creates a backend with an explicit model and optional timeout.
    pub fn with_config(provider: Provider, model: String, timeout: Option<Duration>) -> Self {
        let full_model = format!("{}:{}", provider.prefix(), model);
        debug!(
            "Creating GenAI backend: provider={}, model={}",
            provider.name(),
            model
        );
        Self {
            client: Client::default(),
            model: full_model,
            provider,
            timeout: timeout.unwrap_or(Duration::from_secs(120)),
        }
    }

    /// Internal call to the GenAI API, bounded by the request timeout.
    async fn generate(&self, prompt: String) -> Result<String, BackendError> {
        let chat_req = ChatRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ]);
        let options = ChatOptions::default().with_temperature(0.2);

        let start = std::time::Instant::now();

        let exec = self.client.exec_chat(&self.model, chat_req, Some(&options));
        let response = tokio::time::timeout(self.timeout, exec)
            .await
            .map_err(|_| BackendError::TimeoutError {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| {
                error!("{} API error: {}", self.provider.name(), e);
                BackendError::ApiError {
                    message: format!("{} request failed: {}", self.provider.name(), e),
                    status_code: None,
                }
            })?;

        info!(
            "{} generation completed in {:.2}s",
            self.provider.name(),
            start.elapsed().as_secs_f64()
        );

        let content = response
            .first_text()
            .ok_or_else(|| BackendError::InvalidResponse {
                message: "No text content in response".to_string(),
                raw_response: None,
            })?
            .to_string();

        debug!(
            "{} response length: {} characters",
            self.provider.name(),
            content.len()
        );

        Ok(content)
    }
}

#[async_trait]
impl FixBackend for GenAIBackend {
    async fn analyze(&self, request: &FixRequest) -> Result<FixResponse, BackendError> {
        info!(
            "Requesting failure analysis from {} (attempt {})",
            self.provider.name(),
            request.attempt_number
        );

        let prompt = PromptBuilder::build_fix_prompt(request);
        debug!("Built fix prompt with {} characters", prompt.len());

        let response_text = self.generate(prompt).await?;

        parse_fix_response(&response_text).map_err(|e| {
            error!("Failed to parse {} response: {}", self.provider.name(), e);
            BackendError::ParseError {
                message: e.to_string(),
                context: response_text.chars().take(200).collect(),
            }
        })
    }

    fn name(&self) -> &str {
        self.provider.name()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for GenAIBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIBackend")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
