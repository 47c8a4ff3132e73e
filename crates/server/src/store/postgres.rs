use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gpulaw_common::types::{
    Case, CaseSummary, Document, DocumentSummary, Template, TemplateSummary, UnknownVariant,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{classify_sqlx_error, DocumentChanges, NewCase, NewDocument, StoreError};

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: String,
    title: String,
    client_name: String,
    category: String,
    description: String,
    status: String,
    owner_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct DocumentSummaryRow {
    id: String,
    case_id: String,
    title: String,
    status: String,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    title: String,
    content: String,
    doc_type: String,
    status: String,
    language: String,
    case_id: String,
    template_id: Option<String>,
    owner_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    case_title: Option<String>,
    case_category: Option<String>,
    case_client_name: Option<String>,
    template_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: String,
    name: String,
    content: String,
}

fn parse_literal<T>(value: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = UnknownVariant>,
{
    value.parse().map_err(|error: UnknownVariant| StoreError::Internal(error.to_string()))
}

impl TryFrom<CaseRow> for Case {
    type Error = StoreError;

    fn try_from(value: CaseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            category: parse_literal(&value.category)?,
            status: parse_literal(&value.status)?,
            id: value.id,
            title: value.title,
            client_name: value.client_name,
            description: value.description,
            owner_id: value.owner_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            documents: Vec::new(),
        })
    }
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(value: DocumentRow) -> Result<Self, Self::Error> {
        let case_summary = match (value.case_title, value.case_category, value.case_client_name) {
            (Some(title), Some(category), Some(client_name)) => Some(CaseSummary {
                title,
                category: parse_literal(&category)?,
                client_name,
            }),
            _ => None,
        };

        Ok(Self {
            doc_type: parse_literal(&value.doc_type)?,
            status: parse_literal(&value.status)?,
            language: parse_literal(&value.language)?,
            id: value.id,
            title: value.title,
            content: value.content,
            case_id: value.case_id,
            template_id: value.template_id,
            owner_id: value.owner_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            case_summary,
            template_summary: value.template_name.map(|name| TemplateSummary { name }),
        })
    }
}

impl From<TemplateRow> for Template {
    fn from(value: TemplateRow) -> Self {
        Self { id: value.id, name: value.name, content: value.content }
    }
}

const CASE_COLUMNS: &str =
    "id, title, client_name, category, description, status, owner_id, created_at, updated_at";

const DOCUMENT_SELECT: &str = r#"
    SELECT
        d.id,
        d.title,
        d.content,
        d.doc_type,
        d.status,
        d.language,
        d.case_id,
        d.template_id,
        d.owner_id,
        d.created_at,
        d.updated_at,
        c.title AS case_title,
        c.category AS case_category,
        c.client_name AS case_client_name,
        t.name AS template_name
    FROM documents AS d
    LEFT JOIN cases AS c ON c.id = d.case_id
    LEFT JOIN document_templates AS t ON t.id = d.template_id
"#;

pub(super) async fn create_case(pool: &PgPool, input: &NewCase) -> Result<Case, StoreError> {
    let row = sqlx::query_as::<_, CaseRow>(&format!(
        r#"
        INSERT INTO cases (id, title, client_name, category, description, status, owner_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {CASE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(&input.title)
    .bind(&input.client_name)
    .bind(input.category.as_str())
    .bind(&input.description)
    .bind(input.status.as_str())
    .bind(&input.owner_id)
    .fetch_one(pool)
    .await
    .map_err(classify_sqlx_error)?;

    row.try_into()
}

pub(super) async fn upsert_case(pool: &PgPool, case: &Case) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO cases (id, title, client_name, category, description, status, owner_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            client_name = EXCLUDED.client_name,
            category = EXCLUDED.category,
            description = EXCLUDED.description,
            status = EXCLUDED.status,
            owner_id = EXCLUDED.owner_id,
            updated_at = now()
        "#,
    )
    .bind(&case.id)
    .bind(&case.title)
    .bind(&case.client_name)
    .bind(case.category.as_str())
    .bind(&case.description)
    .bind(case.status.as_str())
    .bind(&case.owner_id)
    .execute(pool)
    .await
    .map_err(classify_sqlx_error)?;

    Ok(())
}

pub(super) async fn get_case(pool: &PgPool, id: &str) -> Result<Case, StoreError> {
    sqlx::query_as::<_, CaseRow>(&format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(classify_sqlx_error)?
        .ok_or(StoreError::NotFound)?
        .try_into()
}

pub(super) async fn list_cases(pool: &PgPool, owner_id: &str) -> Result<Vec<Case>, StoreError> {
    let rows = sqlx::query_as::<_, CaseRow>(&format!(
        "SELECT {CASE_COLUMNS} FROM cases WHERE owner_id = $1 ORDER BY updated_at DESC, id"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .map_err(classify_sqlx_error)?;

    let case_ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
    let summary_rows = sqlx::query_as::<_, DocumentSummaryRow>(
        r#"
        SELECT id, case_id, title, status
        FROM documents
        WHERE case_id = ANY($1)
        ORDER BY updated_at DESC, id
        "#,
    )
    .bind(&case_ids)
    .fetch_all(pool)
    .await
    .map_err(classify_sqlx_error)?;

    let mut summaries: HashMap<String, Vec<DocumentSummary>> = HashMap::new();
    for row in summary_rows {
        let summary =
            DocumentSummary { id: row.id, title: row.title, status: parse_literal(&row.status)? };
        summaries.entry(row.case_id).or_default().push(summary);
    }

    rows.into_iter()
        .map(|row| {
            let mut case = Case::try_from(row)?;
            case.documents = summaries.remove(&case.id).unwrap_or_default();
            Ok(case)
        })
        .collect()
}

pub(super) async fn create_document(
    pool: &PgPool,
    input: &NewDocument,
) -> Result<Document, StoreError> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO documents
            (id, title, content, doc_type, status, language, case_id, template_id, owner_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(&id)
    .bind(&input.title)
    .bind(&input.content)
    .bind(input.doc_type.as_str())
    .bind(input.status.as_str())
    .bind(input.language.as_str())
    .bind(&input.case_id)
    .bind(input.template_id.as_deref())
    .bind(&input.owner_id)
    .execute(pool)
    .await
    .map_err(classify_sqlx_error)?;

    get_document(pool, &id).await
}

pub(super) async fn get_document(pool: &PgPool, id: &str) -> Result<Document, StoreError> {
    sqlx::query_as::<_, DocumentRow>(&format!("{DOCUMENT_SELECT} WHERE d.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(classify_sqlx_error)?
        .ok_or(StoreError::NotFound)?
        .try_into()
}

pub(super) async fn update_document(
    pool: &PgPool,
    id: &str,
    changes: &DocumentChanges,
) -> Result<Document, StoreError> {
    let updated = sqlx::query_scalar::<_, String>(
        r#"
        UPDATE documents
        SET
            title = COALESCE($2, title),
            content = COALESCE($3, content),
            status = COALESCE($4, status),
            doc_type = COALESCE($5, doc_type),
            language = COALESCE($6, language),
            updated_at = now()
        WHERE id = $1
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(changes.title.as_deref())
    .bind(changes.content.as_deref())
    .bind(changes.status.map(|status| status.as_str()))
    .bind(changes.doc_type.map(|doc_type| doc_type.as_str()))
    .bind(changes.language.map(|language| language.as_str()))
    .fetch_optional(pool)
    .await
    .map_err(classify_sqlx_error)?;

    match updated {
        Some(id) => get_document(pool, &id).await,
        None => Err(StoreError::NotFound),
    }
}

pub(super) async fn delete_document(pool: &PgPool, id: &str) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(classify_sqlx_error)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub(super) async fn list_documents(
    pool: &PgPool,
    owner_id: &str,
    case_id: Option<&str>,
) -> Result<Vec<Document>, StoreError> {
    let rows = sqlx::query_as::<_, DocumentRow>(&format!(
        r#"
        {DOCUMENT_SELECT}
        WHERE d.owner_id = $1
          AND ($2::text IS NULL OR d.case_id = $2)
        ORDER BY d.updated_at DESC, d.id
        "#
    ))
    .bind(owner_id)
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(classify_sqlx_error)?;

    rows.into_iter().map(Document::try_from).collect()
}

pub(super) async fn get_template(pool: &PgPool, id: &str) -> Result<Template, StoreError> {
    sqlx::query_as::<_, TemplateRow>("SELECT id, name, content FROM document_templates WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(classify_sqlx_error)?
        .map(Template::from)
        .ok_or(StoreError::NotFound)
}

pub(super) async fn list_templates(pool: &PgPool) -> Result<Vec<Template>, StoreError> {
    let rows = sqlx::query_as::<_, TemplateRow>(
        "SELECT id, name, content FROM document_templates ORDER BY name, id",
    )
    .fetch_all(pool)
    .await
    .map_err(classify_sqlx_error)?;

    Ok(rows.into_iter().map(Template::from).collect())
}
