// Anthropic Messages API client.
//
// One POST per call to `{base_url}/v1/messages`. Upstream status codes and
// error messages are propagated verbatim in `GenerationError::Failure`.

use gpulaw_common::prompt::GenerationRequest;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    GenerationClient, GenerationError, GenerationFuture, GenerationHealth, API_KEY_PREFIX,
    HEALTH_CHECK_MAX_OUTPUT_TOKENS,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const HEALTH_CHECK_PROMPT: &str = "Say \"Hello, API is working!\"";

#[derive(Clone)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    /// Scheme and host, without the `/v1/messages` path.
    pub base_url: String,
    /// Model used for drafting and chat.
    pub model: String,
    /// Smaller model used by the health check.
    pub check_model: String,
}

pub struct AnthropicClient {
    http: reqwest::Client,
    config: AnthropicConfig,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: String,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn headers(&self, api_key: &str) -> Result<HeaderMap, GenerationError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| GenerationError::failure(None, "API key contains invalid characters"))?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn send(
        &self,
        model: &str,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(GenerationError::failure(None, "ANTHROPIC_API_KEY is not configured"));
        };

        let body = MessagesRequest {
            model,
            max_tokens,
            system,
            messages: [ChatMessage { role: "user", content: user }],
        };

        debug!(model, max_tokens, "sending generation request");

        let response = self
            .http
            .post(self.messages_url())
            .headers(self.headers(api_key)?)
            .json(&body)
            .send()
            .await
            .map_err(|error| GenerationError::failure(None, error.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| GenerationError::failure(Some(status.as_u16()), error.to_string()))?;

        if !status.is_success() {
            let (error_type, message) = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(parsed) => (parsed.error.error_type, parsed.error.message),
                Err(_) if text.trim().is_empty() => {
                    (None, status.canonical_reason().unwrap_or("upstream error").to_string())
                }
                Err(_) => (None, text),
            };
            warn!(
                status = status.as_u16(),
                error_type = error_type.as_deref().unwrap_or("unknown"),
                %message,
                "generation request rejected upstream"
            );
            return Err(GenerationError::failure(Some(status.as_u16()), message));
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&text).map_err(|_| GenerationError::UnexpectedResponseFormat)?;

        parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or(GenerationError::UnexpectedResponseFormat)
    }
}

impl GenerationClient for AnthropicClient {
    fn generate(
        &self,
        request: GenerationRequest,
        max_output_tokens: u32,
    ) -> GenerationFuture<'_, Result<String, GenerationError>> {
        Box::pin(async move {
            self.send(
                &self.config.model,
                Some(&request.system_instructions),
                &request.user_instructions,
                max_output_tokens,
            )
            .await
        })
    }

    fn check_health(&self) -> GenerationFuture<'_, GenerationHealth> {
        Box::pin(async move {
            let api_key = self.config.api_key.as_deref();
            let mut health = GenerationHealth {
                api_key_configured: api_key.is_some(),
                api_key_format_valid: api_key.is_some_and(|key| key.starts_with(API_KEY_PREFIX)),
                model: self.config.check_model.clone(),
                reply: None,
                upstream_status: None,
                error: None,
            };

            if api_key.is_none() {
                health.error = Some("ANTHROPIC_API_KEY is not configured".to_string());
                return health;
            }

            match self
                .send(
                    &self.config.check_model,
                    None,
                    HEALTH_CHECK_PROMPT,
                    HEALTH_CHECK_MAX_OUTPUT_TOKENS,
                )
                .await
            {
                Ok(reply) => health.reply = Some(reply),
                Err(GenerationError::Failure { status, message }) => {
                    health.upstream_status = status;
                    health.error = Some(message);
                }
                Err(error @ GenerationError::UnexpectedResponseFormat) => {
                    health.error = Some(error.to_string());
                }
            }

            health
        })
    }
}
