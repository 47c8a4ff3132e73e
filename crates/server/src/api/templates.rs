use axum::{extract::State, Json};
use gpulaw_common::types::Template;
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct TemplatesEnvelope {
    pub templates: Vec<Template>,
    pub degraded: bool,
}

pub(super) async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<TemplatesEnvelope>, ApiError> {
    let listed = state.gateway.list_templates().await?;
    Ok(Json(TemplatesEnvelope { templates: listed.value, degraded: listed.degraded }))
}
