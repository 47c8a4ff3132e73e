// REST API for the document service.
//
// Routes:
//   POST   /v1/cases                      create a case
//   GET    /v1/cases                      list the owner's cases
//   GET    /v1/cases/{id}                 get a case
//   POST   /v1/documents                  create a document
//   GET    /v1/documents?caseId=          list the owner's documents
//   POST   /v1/documents/generate         draft a document
//   GET    /v1/documents/{id}             get a document
//   PUT    /v1/documents/{id}             update a document
//   DELETE /v1/documents/{id}             delete a document
//   GET    /v1/documents/{id}/rendered    normalized markdown
//   POST   /v1/documents/{id}/chat        ask about a document
//   GET    /v1/templates                  list templates
//   GET    /v1/generation/health          check the generation capability

pub mod cases;
pub mod chat;
pub mod documents;
pub mod generate;
pub mod health;
pub mod templates;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    conversation::{ConversationError, ConversationService},
    error::{ApiError, ErrorCode},
    generation::{GenerationClient, GenerationError},
    session::DefaultOwner,
    store::{PersistenceGateway, StoreError},
};

#[derive(Clone)]
pub struct AppState {
    pub gateway: PersistenceGateway,
    pub generation: Arc<dyn GenerationClient>,
    pub conversation: ConversationService,
    pub default_owner: DefaultOwner,
}

impl AppState {
    pub fn new(
        gateway: PersistenceGateway,
        generation: Arc<dyn GenerationClient>,
        chat_token_budget: usize,
        default_owner: impl Into<String>,
    ) -> Self {
        let conversation = ConversationService::new(Arc::clone(&generation), chat_token_budget);
        Self { gateway, generation, conversation, default_owner: DefaultOwner(default_owner.into()) }
    }
}

impl FromRef<AppState> for DefaultOwner {
    fn from_ref(state: &AppState) -> Self {
        state.default_owner.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/cases", post(cases::create_case).get(cases::list_cases))
        .route("/v1/cases/{id}", get(cases::get_case))
        .route("/v1/documents", post(documents::create_document).get(documents::list_documents))
        .route("/v1/documents/generate", post(generate::generate_document))
        .route(
            "/v1/documents/{id}",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/v1/documents/{id}/rendered", get(documents::render_document))
        .route("/v1/documents/{id}/chat", post(chat::ask_about_document))
        .route("/v1/templates", get(templates::list_templates))
        .route("/v1/generation/health", get(health::check_generation))
        .with_state(state)
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(reason) => {
                warn!(%reason, "document store unavailable");
                ApiError::from_code(ErrorCode::StoreUnavailable)
            }
            StoreError::NotFound => ApiError::from_code(ErrorCode::NotFound),
            StoreError::Invalid(message) => ApiError::new(ErrorCode::ValidationFailed, message)
                .with_details(json!({ "kind": "invalid_reference" })),
            StoreError::Internal(message) => {
                error!(error = %message, "document store internal error");
                ApiError::from_code(ErrorCode::InternalError)
            }
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::Failure { status, message } => {
                ApiError::new(ErrorCode::GenerationFailed, message.clone()).with_details(json!({
                    "upstream_status": status,
                    "upstream_message": message,
                }))
            }
            GenerationError::UnexpectedResponseFormat => {
                error!("text generation returned no text content");
                ApiError::from_code(ErrorCode::InternalError)
            }
        }
    }
}

impl From<ConversationError> for ApiError {
    fn from(error: ConversationError) -> Self {
        match error {
            ConversationError::Compose(compose) => {
                ApiError::new(ErrorCode::ValidationFailed, compose.to_string())
            }
            ConversationError::Generation(generation) => generation.into(),
        }
    }
}
