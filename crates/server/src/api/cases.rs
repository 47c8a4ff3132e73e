use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gpulaw_common::types::{Case, CaseCategory, CaseStatus};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    error::ApiError,
    session::Session,
    store::NewCase,
    validation::{require_text, ValidatedJson},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseRequest {
    pub title: String,
    pub client_name: String,
    pub category: CaseCategory,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaseEnvelope {
    pub case: Case,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CasesEnvelope {
    pub cases: Vec<Case>,
    pub degraded: bool,
}

pub(super) async fn create_case(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(payload): ValidatedJson<CreateCaseRequest>,
) -> Result<(StatusCode, Json<CaseEnvelope>), ApiError> {
    require_text("title", &payload.title)?;
    require_text("clientName", &payload.client_name)?;

    let created = state
        .gateway
        .create_case(NewCase {
            title: payload.title,
            client_name: payload.client_name,
            category: payload.category,
            description: payload.description.unwrap_or_default(),
            status: CaseStatus::default(),
            owner_id: session.owner_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CaseEnvelope { case: created.value, degraded: Some(created.degraded) }),
    ))
}

pub(super) async fn list_cases(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CasesEnvelope>, ApiError> {
    let listed = state.gateway.list_cases(&session.owner_id).await?;
    Ok(Json(CasesEnvelope { cases: listed.value, degraded: listed.degraded }))
}

pub(super) async fn get_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CaseEnvelope>, ApiError> {
    let case = state.gateway.get_case(&id).await?;
    Ok(Json(CaseEnvelope { case, degraded: None }))
}
