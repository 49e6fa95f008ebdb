//! Reasoning service trait and request/response shapes.
//!
//! The cognition loop hands a [`ReasoningRequest`] (system prompt, prior
//! turns, user prompt) to a [`ReasoningService`] and awaits a
//! [`ReasoningReply`] whose content should be the JSON decision object.
//! The service could be a hosted language model, a local one, or a
//! scripted stand-in for tests.
//!
//! The trait uses return-position `impl Future` and is consumed through
//! generics, never as a trait object.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Errors a reasoning call can end with. All of them are recoverable:
/// the cognition loop substitutes a safe default action.
#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    /// The request never completed (connection, TLS, body read).
    #[error("reasoning transport failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("reasoning service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The service answered but the reply had no usable content.
    #[error("reasoning reply malformed: {0}")]
    MalformedReply(String),

    /// No reply within the decision deadline.
    #[error("reasoning call timed out after {deadline_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions.
    System,
    /// The simulation speaking for the world.
    User,
    /// The agent's earlier answers.
    Assistant,
}

impl ChatRole {
    /// Wire label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: ChatRole,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Everything sent for one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningRequest {
    /// System message, prior turns, then the current user message.
    pub messages: Vec<ChatMessage>,
    /// Ask the service to answer with a JSON object.
    pub json_output: bool,
    /// Sampling temperature.
    pub temperature: f64,
    /// Determinism seed.
    pub seed: u64,
}

/// Token counts reported by the service for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens billed at the full input rate.
    pub prompt_tokens: u64,
    /// Prompt tokens served from the provider's cache.
    pub cached_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
}

/// The service's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningReply {
    /// Raw text content, expected to hold the JSON decision.
    pub content: String,
    /// Model that produced the answer.
    pub model: String,
    /// Token usage for the call.
    pub usage: TokenUsage,
}

/// A source of decisions.
pub trait ReasoningService: Send + Sync {
    /// Answer one request.
    ///
    /// # Errors
    ///
    /// Returns [`ReasoningError`] on transport failures, non-success
    /// statuses, or replies without content.
    fn decide(
        &self,
        request: &ReasoningRequest,
    ) -> impl Future<Output = Result<ReasoningReply, ReasoningError>> + Send;
}

// ---------------------------------------------------------------------------
// Scripted service
// ---------------------------------------------------------------------------

/// Replays a fixed queue of replies, then repeats a fallback.
///
/// Every request is recorded so tests can inspect what was sent.
#[derive(Debug, Default)]
pub struct ScriptedReasoning {
    replies: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    seen: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedReasoning {
    /// Answer with `replies` in order, then with `fallback` forever.
    pub fn new<I, S>(replies: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            fallback: fallback.into(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue a transport failure as the next answer.
    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(message.into()));
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ReasoningService for ScriptedReasoning {
    async fn decide(&self, request: &ReasoningRequest) -> Result<ReasoningReply, ReasoningError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| Ok(self.fallback.clone()));
        let content = next.map_err(ReasoningError::Transport)?;
        Ok(ReasoningReply {
            content,
            model: "scripted".to_owned(),
            usage: TokenUsage::default(),
        })
    }
}
