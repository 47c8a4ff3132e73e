// Interactive document drafting.
//
// A generation failure here is the one place the static fallback document is
// served instead of an error.

use axum::{extract::State, Json};
use chrono::Utc;
use gpulaw_common::prompt::{
    compose_draft_request, fallback_document, generated_document_title, DraftInput,
};
use gpulaw_common::types::{CaseCategory, Document, DocumentStatus, DocumentType, Language};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::{
    error::{ApiError, ErrorCode},
    generation::{GenerationError, DOCUMENT_MAX_OUTPUT_TOKENS},
    session::Session,
    store::NewDocument,
    validation::{non_blank, require_text, ValidatedJson},
};

const DEFAULT_LANGUAGE_CODE: &str = "en";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDocumentRequest {
    pub case_id: Option<String>,
    #[serde(alias = "caseCategory")]
    pub category: Option<CaseCategory>,
    pub client_name: Option<String>,
    #[serde(default)]
    pub user_prompt: String,
    pub additional_context: Option<String>,
    /// Raw language code; unsupported codes draft in English.
    pub language: Option<String>,
    pub template_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateDocumentResponse {
    pub content: String,
    /// The persisted document, when one was stored.
    pub document: Option<Document>,
    pub fallback: bool,
    pub error: Option<String>,
}

struct ResolvedTemplate {
    id: String,
    content: String,
}

pub(super) async fn generate_document(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(payload): ValidatedJson<GenerateDocumentRequest>,
) -> Result<Json<GenerateDocumentResponse>, ApiError> {
    require_text("userPrompt", &payload.user_prompt)?;

    let case_id = non_blank(payload.case_id.as_deref());
    let stored_case = match case_id {
        Some(case_id) => match state.gateway.get_case(case_id).await {
            Ok(case) => Some(case),
            Err(error) => {
                warn!(case_id, %error, "case lookup failed; using request fields");
                None
            }
        },
        None => None,
    };

    let (category, client_name) = match &stored_case {
        Some(case) => (Some(case.category), Some(case.client_name.as_str())),
        None => (payload.category, non_blank(payload.client_name.as_deref())),
    };
    let Some(category) = category else {
        return Err(ApiError::new(
            ErrorCode::ValidationFailed,
            "category is required when no stored case is found",
        )
        .with_details(serde_json::json!({ "field": "category" })));
    };

    let template = match non_blank(payload.template_id.as_deref()) {
        Some(template_id) => match state.gateway.get_template(template_id).await {
            Ok(template) => Some(ResolvedTemplate { id: template.id, content: template.content }),
            Err(error) => {
                warn!(template_id, %error, "template lookup failed; drafting without template");
                None
            }
        },
        None => None,
    };

    let language = payload.language.as_deref().unwrap_or(DEFAULT_LANGUAGE_CODE);
    let request = compose_draft_request(&DraftInput {
        category,
        template: template.as_ref().map(|template| template.content.as_str()),
        user_prompt: &payload.user_prompt,
        additional_context: payload.additional_context.as_deref(),
        client_name,
        language,
    })
    .map_err(|error| ApiError::new(ErrorCode::ValidationFailed, error.to_string()))?;

    let today = Utc::now().date_naive();
    let content = match state.generation.generate(request, DOCUMENT_MAX_OUTPUT_TOKENS).await {
        Ok(content) => content,
        Err(GenerationError::Failure { status, message }) => {
            warn!(?status, %message, %category, "drafting failed; serving fallback document");
            return Ok(Json(GenerateDocumentResponse {
                content: fallback_document(category, client_name, &payload.user_prompt, today),
                document: None,
                fallback: true,
                error: Some(message),
            }));
        }
        Err(error @ GenerationError::UnexpectedResponseFormat) => return Err(error.into()),
    };

    let document = match case_id {
        Some(case_id) if session.persists_generation() => {
            let new_document = NewDocument {
                title: generated_document_title(category, today),
                content: content.clone(),
                doc_type: DocumentType::for_category(category),
                status: DocumentStatus::AiGenerated,
                language: Language::from_code_lossy(language),
                case_id: case_id.to_string(),
                template_id: template.map(|template| template.id),
                owner_id: session.owner_id,
            };
            persist_generated(&state, new_document).await
        }
        _ => None,
    };

    Ok(Json(GenerateDocumentResponse { content, document, fallback: false, error: None }))
}

/// Only durably stored documents are reported back; a failed or degraded
/// save still returns the generated content.
async fn persist_generated(state: &AppState, document: NewDocument) -> Option<Document> {
    let case_id = document.case_id.clone();
    match state.gateway.create_document(document).await {
        Ok(persisted) if !persisted.degraded => {
            info!(document_id = %persisted.value.id, %case_id, "generated document stored");
            Some(persisted.value)
        }
        Ok(_) => {
            warn!(%case_id, "store unavailable; generated document not stored");
            None
        }
        Err(error) => {
            warn!(%case_id, %error, "failed to store generated document");
            None
        }
    }
}
