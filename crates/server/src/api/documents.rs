// Document CRUD and rendering.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gpulaw_common::markdown::{apply_hard_line_breaks, normalize};
use gpulaw_common::types::{Document, DocumentStatus, DocumentType, Language};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    error::ApiError,
    session::Session,
    store::{DocumentChanges, NewDocument},
    validation::{non_blank, require_text, ValidatedJson},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub case_id: String,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<DocumentStatus>,
    #[serde(rename = "type")]
    pub doc_type: Option<DocumentType>,
    pub language: Option<Language>,
    /// Apply markdown hard line breaks to the submitted content before saving.
    #[serde(default)]
    pub ai_format: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsQuery {
    pub case_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentEnvelope {
    pub document: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DocumentsEnvelope {
    pub documents: Vec<Document>,
    pub degraded: bool,
}

#[derive(Debug, Serialize)]
pub struct RenderedDocument {
    pub id: String,
    pub content: String,
}

pub(super) async fn create_document(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(payload): ValidatedJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentEnvelope>), ApiError> {
    require_text("title", &payload.title)?;
    require_text("content", &payload.content)?;
    require_text("caseId", &payload.case_id)?;

    let template_id = non_blank(payload.template_id.as_deref()).map(ToOwned::to_owned);
    let created = state
        .gateway
        .create_document(NewDocument {
            title: payload.title,
            content: payload.content,
            doc_type: payload.doc_type,
            status: payload.status.unwrap_or_default(),
            language: payload.language.unwrap_or_default(),
            case_id: payload.case_id,
            template_id,
            owner_id: session.owner_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DocumentEnvelope { document: created.value, degraded: Some(created.degraded) }),
    ))
}

pub(super) async fn list_documents(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<DocumentsEnvelope>, ApiError> {
    let case_id = non_blank(query.case_id.as_deref());
    let listed = state.gateway.list_documents(&session.owner_id, case_id).await?;
    Ok(Json(DocumentsEnvelope { documents: listed.value, degraded: listed.degraded }))
}

pub(super) async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentEnvelope>, ApiError> {
    let document = state.gateway.get_document(&id).await?;
    Ok(Json(DocumentEnvelope { document, degraded: None }))
}

pub(super) async fn render_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RenderedDocument>, ApiError> {
    let document = state.gateway.get_document(&id).await?;
    Ok(Json(RenderedDocument { content: normalize(&document.content), id: document.id }))
}

pub(super) async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateDocumentRequest>,
) -> Result<Json<DocumentEnvelope>, ApiError> {
    if let Some(title) = payload.title.as_deref() {
        require_text("title", title)?;
    }

    let content = match payload.content {
        Some(content) if payload.ai_format => Some(apply_hard_line_breaks(&content)),
        content => content,
    };
    let changes = DocumentChanges {
        title: payload.title,
        content,
        status: payload.status,
        doc_type: payload.doc_type,
        language: payload.language,
    };

    let document = state.gateway.update_document(&id, &changes).await?;
    Ok(Json(DocumentEnvelope { document, degraded: None }))
}

pub(super) async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.gateway.delete_document(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use gpulaw_common::types::Template;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::api::test_support::{
        body_json, delete_request, get_request, json_request, test_app, TestApp,
    };
    use crate::generation::testing::MockGenerationClient;

    async fn app_with_document(content: &str) -> (TestApp, String) {
        let app = test_app(MockGenerationClient::default());
        app.gateway.seed_demo("demo-user").await.unwrap();
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/documents",
                json!({
                    "title": "Compliance memo",
                    "content": content,
                    "type": "COMPLIANCE_REPORT",
                    "caseId": "demo-case"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["document"]["id"].as_str().unwrap().to_string();
        (app, id)
    }

    #[tokio::test]
    async fn create_document_applies_defaults_and_attaches_case() {
        let (app, id) = app_with_document("# Memo").await;

        let response = app.router.oneshot(get_request(&format!("/v1/documents/{id}"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["document"]["status"], "AI_GENERATED");
        assert_eq!(body["document"]["language"], "en");
        assert_eq!(body["document"]["type"], "COMPLIANCE_REPORT");
        assert_eq!(body["document"]["case"]["title"], "Demo Case - Crypto Exchange Compliance");
        assert_eq!(body["document"]["case"]["category"], "CRYPTO_EXCHANGE_COMPLIANCE");
    }

    #[tokio::test]
    async fn create_document_for_missing_case_is_rejected() {
        let app = test_app(MockGenerationClient::default());

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/v1/documents",
                json!({ "title": "Memo", "content": "# Memo", "type": "LEGAL_OPINION", "caseId": "ghost" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["details"]["kind"], "invalid_reference");
    }

    #[tokio::test]
    async fn create_document_requires_content() {
        let app = test_app(MockGenerationClient::default());
        app.gateway.seed_demo("demo-user").await.unwrap();

        let missing = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/documents",
                json!({ "title": "Memo", "type": "LEGAL_OPINION", "caseId": "demo-case" }),
            ))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(missing).await["error"]["code"], "VALIDATION_FAILED");

        let blank = app
            .router
            .oneshot(json_request(
                "POST",
                "/v1/documents",
                json!({
                    "title": "Memo",
                    "content": " \n",
                    "type": "LEGAL_OPINION",
                    "caseId": "demo-case"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(blank).await["error"]["details"]["field"], "content");

        assert!(app.gateway.list_documents("demo-user", None).await.unwrap().value.is_empty());
    }

    #[tokio::test]
    async fn create_document_during_outage_returns_synthetic_document() {
        let app = test_app(MockGenerationClient::default());
        app.memory.write().await.set_reachable(false);

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/v1/documents",
                json!({
                    "title": "Memo",
                    "content": "# Draft",
                    "type": "PRIVACY_POLICY",
                    "caseId": "case-9",
                    "language": "zh-CN"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["degraded"], true);
        assert!(body["document"]["id"].as_str().unwrap().starts_with("demo-"));
        assert_eq!(body["document"]["language"], "zh-CN");
        assert_eq!(body["document"]["case"]["title"], "Demo Case");
    }

    #[tokio::test]
    async fn unknown_status_literal_is_rejected() {
        let (app, id) = app_with_document("# Memo").await;

        let response = app
            .router
            .oneshot(json_request("PUT", &format!("/v1/documents/{id}"), json!({ "status": "REVIEWED" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["details"]["kind"], "data_error");
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let (app, id) = app_with_document("# Memo").await;

        let response = app
            .router
            .oneshot(json_request(
                "PUT",
                &format!("/v1/documents/{id}"),
                json!({ "status": "APPROVED", "type": "LEGAL_OPINION" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["document"]["status"], "APPROVED");
        assert_eq!(body["document"]["type"], "LEGAL_OPINION");
        assert_eq!(body["document"]["title"], "Compliance memo");
        assert_eq!(body["document"]["content"], "# Memo");
    }

    #[tokio::test]
    async fn update_with_ai_format_adds_hard_line_breaks() {
        let (app, id) = app_with_document("# Memo").await;

        let response = app
            .router
            .oneshot(json_request(
                "PUT",
                &format!("/v1/documents/{id}"),
                json!({ "content": "A\nB  \n\nC", "aiFormat": true }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["document"]["content"], "A  \nB  \n\nC  ");
    }

    #[tokio::test]
    async fn update_missing_document_is_404_and_outage_is_503() {
        let app = test_app(MockGenerationClient::default());

        let missing = app
            .router
            .clone()
            .oneshot(json_request("PUT", "/v1/documents/ghost", json!({ "title": "Renamed" })))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        app.memory.write().await.set_reachable(false);
        let outage = app
            .router
            .oneshot(json_request("PUT", "/v1/documents/ghost", json!({ "title": "Renamed" })))
            .await
            .unwrap();
        assert_eq!(outage.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn delete_returns_204_then_404() {
        let (app, id) = app_with_document("# Memo").await;
        let uri = format!("/v1/documents/{id}");

        let deleted = app.router.clone().oneshot(delete_request(&uri)).await.unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let again = app.router.oneshot(delete_request(&uri)).await.unwrap();
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_documents_filters_by_case() {
        let (app, id) = app_with_document("# Memo").await;

        let for_case =
            app.router.clone().oneshot(get_request("/v1/documents?caseId=demo-case")).await.unwrap();
        let body = body_json(for_case).await;
        assert_eq!(body["degraded"], false);
        assert_eq!(body["documents"][0]["id"], id.as_str());

        let other = app
            .router
            .clone()
            .oneshot(get_request("/v1/documents?caseId=demo-case-defi-aml"))
            .await
            .unwrap();
        assert!(body_json(other).await["documents"].as_array().unwrap().is_empty());

        app.memory.write().await.set_reachable(false);
        let outage = app.router.oneshot(get_request("/v1/documents")).await.unwrap();
        let body = body_json(outage).await;
        assert_eq!(body["degraded"], true);
        assert!(body["documents"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rendered_document_is_normalized() {
        let (app, id) = app_with_document("Intro: 1. first 2. second\n# Next").await;

        let response = app
            .router
            .oneshot(get_request(&format!("/v1/documents/{id}/rendered")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], id.as_str());
        assert_eq!(body["content"], "Intro:\n\n1. first\n2. second\n\n# Next");
    }

    #[tokio::test]
    async fn document_view_attaches_template_name() {
        let app = test_app(MockGenerationClient::default());
        app.gateway.seed_demo("demo-user").await.unwrap();
        app.memory.write().await.insert_template(Template {
            id: "tpl-opinion".into(),
            name: "Standard Opinion".into(),
            content: "# Opinion".into(),
        });

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/v1/documents",
                json!({
                    "title": "Opinion",
                    "content": "# Opinion",
                    "type": "LEGAL_OPINION",
                    "caseId": "demo-case",
                    "templateId": "tpl-opinion"
                }),
            ))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["document"]["templateId"], "tpl-opinion");
        assert_eq!(body["document"]["template"]["name"], "Standard Opinion");
    }
}
