use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    error::ApiError,
    validation::{require_text, ValidatedJson},
};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(alias = "message", default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub reply: String,
}

pub(super) async fn ask_about_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    require_text("question", &payload.question)?;

    let document = state.gateway.get_document(&id).await?;
    let reply = state.conversation.ask(&document.content, &payload.question).await?;

    Ok(Json(AskResponse { reply }))
}
