// Text-generation capability.
//
// The capability is modeled as a trait so handlers can be exercised with a
// canned client. Production wiring uses [`anthropic::AnthropicClient`],
// constructed once in `main` and shared through the router state.

pub mod anthropic;

use std::future::Future;
use std::pin::Pin;

use gpulaw_common::prompt::GenerationRequest;
use serde::Serialize;
use thiserror::Error;

pub use anthropic::{AnthropicClient, AnthropicConfig};

/// Output-token budget for drafting a document.
pub const DOCUMENT_MAX_OUTPUT_TOKENS: u32 = 4096;
/// Output-token budget for a document question.
pub const CHAT_MAX_OUTPUT_TOKENS: u32 = 2048;
/// Output-token budget for the health check round trip.
pub const HEALTH_CHECK_MAX_OUTPUT_TOKENS: u32 = 100;

/// Prefix every valid Anthropic API key carries.
pub const API_KEY_PREFIX: &str = "sk-ant-";

pub type GenerationFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Transport, authentication, quota or upstream failure. `status` is the
    /// upstream HTTP status when a response was received.
    #[error("text generation failed: {message}")]
    Failure { status: Option<u16>, message: String },
    /// The capability answered without any text content.
    #[error("text generation response contained no text content")]
    UnexpectedResponseFormat,
}

impl GenerationError {
    pub fn failure(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Failure { status, message: message.into() }
    }
}

/// Result of the generation health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationHealth {
    pub api_key_configured: bool,
    /// Whether the key carries the expected `sk-ant-` prefix.
    pub api_key_format_valid: bool,
    pub model: String,
    /// Model reply on a successful round trip.
    pub reply: Option<String>,
    pub upstream_status: Option<u16>,
    pub error: Option<String>,
}

impl GenerationHealth {
    pub fn is_healthy(&self) -> bool {
        self.reply.is_some()
    }
}

/// A single blocking round trip to the text-generation capability.
///
/// Implementations never retry and never apply their own timeout.
pub trait GenerationClient: Send + Sync {
    fn generate(
        &self,
        request: GenerationRequest,
        max_output_tokens: u32,
    ) -> GenerationFuture<'_, Result<String, GenerationError>>;

    /// Report configuration and perform a minimal round trip.
    fn check_health(&self) -> GenerationFuture<'_, GenerationHealth>;
}
