// Single-exchange question answering over a stored document.

use std::sync::{Arc, OnceLock};

use gpulaw_common::prompt::{compose_question_request, ComposeError, GenerationRequest};
use thiserror::Error;
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

use crate::generation::{GenerationClient, GenerationError, CHAT_MAX_OUTPUT_TOKENS};

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Stateless: no history is kept between calls, and the full document is
/// always sent.
#[derive(Clone)]
pub struct ConversationService {
    client: Arc<dyn GenerationClient>,
    token_budget: usize,
}

impl ConversationService {
    pub fn new(client: Arc<dyn GenerationClient>, token_budget: usize) -> Self {
        Self { client, token_budget }
    }

    pub async fn ask(
        &self,
        document_content: &str,
        question: &str,
    ) -> Result<String, ConversationError> {
        let request = compose_question_request(document_content, question)?;
        self.observe_prompt_size(&request).await;

        let answer = self.client.generate(request, CHAT_MAX_OUTPUT_TOKENS).await?;
        Ok(answer)
    }

    async fn observe_prompt_size(&self, request: &GenerationRequest) {
        if !may_exceed_budget(request, self.token_budget) {
            return;
        }

        let texts = [request.system_instructions.clone(), request.user_instructions.clone()];
        let counted = tokio::task::spawn_blocking(move || {
            texts.iter().map(|text| count_tokens_cl100k(text)).sum::<Result<usize, String>>()
        })
        .await
        .map_err(|join_error| join_error.to_string())
        .and_then(|counted| counted);

        match counted {
            Ok(prompt_tokens) if prompt_tokens > self.token_budget => warn!(
                prompt_tokens,
                token_budget = self.token_budget,
                "document question exceeds the chat token budget; sending unmodified"
            ),
            Ok(prompt_tokens) => debug!(prompt_tokens, "document question prompt size"),
            Err(error) => debug!(%error, "token counting unavailable; skipping prompt size check"),
        }
    }
}

/// Every cl100k token spans at least one byte, so a prompt no longer than the
/// budget in bytes cannot exceed it in tokens.
fn may_exceed_budget(request: &GenerationRequest, token_budget: usize) -> bool {
    request.system_instructions.len() + request.user_instructions.len() > token_budget
}

pub(crate) fn count_tokens_cl100k(value: &str) -> Result<usize, String> {
    let tokenizer = cl100k_tokenizer()?;
    Ok(tokenizer.encode_with_special_tokens(value).len())
}

fn cl100k_tokenizer() -> Result<&'static CoreBPE, String> {
    static TOKENIZER: OnceLock<Result<CoreBPE, String>> = OnceLock::new();
    let tokenizer =
        TOKENIZER.get_or_init(|| tiktoken_rs::cl100k_base().map_err(|error| error.to_string()));

    match tokenizer {
        Ok(tokenizer) => Ok(tokenizer),
        Err(error) => Err(error.clone()),
    }
}
