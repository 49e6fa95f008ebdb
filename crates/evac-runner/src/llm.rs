//! Reasoning backends over HTTP.
//!
//! Defines an enum-based dispatch for the two supported wire formats:
//! OpenAI-compatible chat completions and the Anthropic Messages API. Both
//! speak over `reqwest` and implement [`ReasoningService`], so the
//! simulation loop is generic over the backend and tests can swap in a
//! scripted service.
//!
//! The backends do not interpret the reply. They return its text content
//! and the token usage the provider reported.

use evac_core::decision::{
    ChatRole, ReasoningError, ReasoningReply, ReasoningRequest, ReasoningService, TokenUsage,
};

use crate::config::{BackendType, LlmBackendConfig};

/// Token cap for one decision reply.
const MAX_REPLY_TOKENS: u32 = 1024;

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// A reasoning backend reachable over HTTP.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

impl ReasoningService for LlmBackend {
    async fn decide(&self, request: &ReasoningRequest) -> Result<ReasoningReply, ReasoningError> {
        match self {
            Self::OpenAi(backend) => backend.complete(request).await,
            Self::Anthropic(backend) => backend.complete(request).await,
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Works with `OpenAI`, `OpenRouter`, `DeepSeek`, and Ollama endpoints.
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Build the request body.
    fn body(&self, request: &ReasoningRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| serde_json::json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "seed": request.seed,
            "max_tokens": MAX_REPLY_TOKENS,
        });
        if request.json_output
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert(
                "response_format".to_owned(),
                serde_json::json!({"type": "json_object"}),
            );
        }
        body
    }

    /// Send a request and return the reply.
    async fn complete(&self, request: &ReasoningRequest) -> Result<ReasoningReply, ReasoningError> {
        let url = format!("{}/chat/completions", self.api_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| ReasoningError::Transport(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ReasoningError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ReasoningError::Transport(format!("OpenAI response read failed: {e}")))?;

        Ok(ReasoningReply {
            content: extract_openai_content(&json)?,
            model: self.model.clone(),
            usage: extract_openai_usage(&json),
        })
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, ReasoningError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ReasoningError::MalformedReply(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })
}

/// Token usage from an `OpenAI` response.
///
/// Cached tokens are reported either under
/// `usage.prompt_tokens_details.cached_tokens` or, by some proxies, as
/// `usage.cached_tokens`. They are split out of the prompt count.
fn extract_openai_usage(json: &serde_json::Value) -> TokenUsage {
    let Some(usage) = json.get("usage") else {
        return TokenUsage::default();
    };
    let field = |v: Option<&serde_json::Value>| v.and_then(serde_json::Value::as_u64).unwrap_or(0);
    let prompt = field(usage.get("prompt_tokens"));
    let cached = field(
        usage
            .get("prompt_tokens_details")
            .and_then(|d| d.get("cached_tokens"))
            .or_else(|| usage.get("cached_tokens")),
    );
    TokenUsage {
        prompt_tokens: prompt.saturating_sub(cached),
        cached_tokens: cached,
        completion_tokens: field(usage.get("completion_tokens")),
    }
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic uses a different request format from `OpenAI`:
/// - Uses `x-api-key` header instead of `Authorization: Bearer`
/// - System text is a top-level field, not a message
/// - There is no JSON response mode; the system prompt asks for JSON
/// - Response structure differs: `content[0].text`
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Build the request body.
    fn body(&self, request: &ReasoningRequest) -> serde_json::Value {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| serde_json::json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_REPLY_TOKENS,
            "temperature": request.temperature,
            "system": system.join("\n\n"),
            "messages": messages,
        })
    }

    /// Send a request and return the reply.
    async fn complete(&self, request: &ReasoningRequest) -> Result<ReasoningReply, ReasoningError> {
        let url = format!("{}/messages", self.api_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| ReasoningError::Transport(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ReasoningError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            ReasoningError::Transport(format!("Anthropic response read failed: {e}"))
        })?;

        Ok(ReasoningReply {
            content: extract_anthropic_content(&json)?,
            model: self.model.clone(),
            usage: extract_anthropic_usage(&json),
        })
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, ReasoningError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ReasoningError::MalformedReply("Anthropic response missing content[0].text".to_owned())
        })
}

/// Token usage from an Anthropic response.
fn extract_anthropic_usage(json: &serde_json::Value) -> TokenUsage {
    let Some(usage) = json.get("usage") else {
        return TokenUsage::default();
    };
    let field = |name: &str| usage.get(name).and_then(serde_json::Value::as_u64).unwrap_or(0);
    TokenUsage {
        prompt_tokens: field("input_tokens"),
        cached_tokens: field("cache_read_input_tokens"),
        completion_tokens: field("output_tokens"),
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create a reasoning backend from configuration.
pub fn create_backend(config: &LlmBackendConfig) -> LlmBackend {
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
    }
}
