// Persistence gateway.
//
// Every call independently attempts the durable store; nothing about past
// failures is cached. When the store is unreachable, creates return a
// synthetic record and listings return fallback data, each marked
// `degraded`. Point lookups, updates and deletes surface the outage.

pub mod demo;
mod memory;
mod postgres;

use std::sync::Arc;

use chrono::Utc;
use gpulaw_common::types::{
    Case, CaseCategory, CaseStatus, CaseSummary, Document, DocumentStatus, DocumentType, Language,
    Template,
};
use sqlx::{migrate::MigrateError, PgPool};
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};
use tracing::warn;
use uuid::Uuid;

pub use memory::MemoryStore;

use crate::db::migrations::MIGRATOR;

/// Prefix of ids given to records that were never persisted. A synthetic id
/// is this prefix followed by 32 hex digits; the seeded `demo-case*` ids share
/// the prefix but never that shape.
pub const SYNTHETIC_ID_PREFIX: &str = "demo-";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No database configured, or the database could not be reached.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("record not found")]
    NotFound,
    /// The store is reachable but a referenced record does not exist.
    #[error("invalid reference: {0}")]
    Invalid(String),
    #[error("document store error: {0}")]
    Internal(String),
}

/// A store result, possibly substituted while the store was unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persisted<T> {
    pub value: T,
    pub degraded: bool,
}

impl<T> Persisted<T> {
    fn durable(value: T) -> Self {
        Self { value, degraded: false }
    }

    fn degraded(value: T) -> Self {
        Self { value, degraded: true }
    }
}

#[derive(Debug, Clone)]
pub struct NewCase {
    pub title: String,
    pub client_name: String,
    pub category: CaseCategory,
    pub description: String,
    pub status: CaseStatus,
    pub owner_id: String,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    pub language: Language,
    pub case_id: String,
    pub template_id: Option<String>,
    pub owner_id: String,
}

/// Fields of a document update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct DocumentChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<DocumentStatus>,
    pub doc_type: Option<DocumentType>,
    pub language: Option<Language>,
}

/// A lazily connected pool whose schema is migrated on first reachable use.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: Arc<OnceCell<()>>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, schema: Arc::new(OnceCell::new()) }
    }

    /// Apply pending migrations. A failed attempt is retried on the next call.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema
            .get_or_try_init(|| async {
                MIGRATOR.run(&self.pool).await.map_err(classify_migrate_error)
            })
            .await
            .map(|_| ())
    }

    async fn pool(&self) -> Result<&PgPool, StoreError> {
        self.ensure_schema().await?;
        Ok(&self.pool)
    }
}

#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    #[cfg_attr(not(test), allow(dead_code))]
    Memory(Arc<RwLock<MemoryStore>>),
    /// No database configured: every call is unavailable.
    Detached,
}

const DETACHED_REASON: &str = "no database configured";

impl Store {
    async fn create_case(&self, input: &NewCase) -> Result<Case, StoreError> {
        match self {
            Self::Postgres(pg) => postgres::create_case(pg.pool().await?, input).await,
            Self::Memory(store) => store.write().await.create_case(input),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn get_case(&self, id: &str) -> Result<Case, StoreError> {
        match self {
            Self::Postgres(pg) => postgres::get_case(pg.pool().await?, id).await,
            Self::Memory(store) => store.read().await.get_case(id),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn list_cases(&self, owner_id: &str) -> Result<Vec<Case>, StoreError> {
        match self {
            Self::Postgres(pg) => postgres::list_cases(pg.pool().await?, owner_id).await,
            Self::Memory(store) => store.read().await.list_cases(owner_id),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn upsert_case(&self, case: &Case) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pg) => postgres::upsert_case(pg.pool().await?, case).await,
            Self::Memory(store) => store.write().await.upsert_case(case),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn create_document(&self, input: &NewDocument) -> Result<Document, StoreError> {
        match self {
            Self::Postgres(pg) => postgres::create_document(pg.pool().await?, input).await,
            Self::Memory(store) => store.write().await.create_document(input),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn get_document(&self, id: &str) -> Result<Document, StoreError> {
        match self {
            Self::Postgres(pg) => postgres::get_document(pg.pool().await?, id).await,
            Self::Memory(store) => store.read().await.get_document(id),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn update_document(
        &self,
        id: &str,
        changes: &DocumentChanges,
    ) -> Result<Document, StoreError> {
        match self {
            Self::Postgres(pg) => postgres::update_document(pg.pool().await?, id, changes).await,
            Self::Memory(store) => store.write().await.update_document(id, changes),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn delete_document(&self, id: &str) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pg) => postgres::delete_document(pg.pool().await?, id).await,
            Self::Memory(store) => store.write().await.delete_document(id),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn list_documents(
        &self,
        owner_id: &str,
        case_id: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        match self {
            Self::Postgres(pg) => {
                postgres::list_documents(pg.pool().await?, owner_id, case_id).await
            }
            Self::Memory(store) => store.read().await.list_documents(owner_id, case_id),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn get_template(&self, id: &str) -> Result<Template, StoreError> {
        match self {
            Self::Postgres(pg) => postgres::get_template(pg.pool().await?, id).await,
            Self::Memory(store) => store.read().await.get_template(id),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }

    async fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        match self {
            Self::Postgres(pg) => postgres::list_templates(pg.pool().await?).await,
            Self::Memory(store) => store.read().await.list_templates(),
            Self::Detached => Err(StoreError::Unavailable(DETACHED_REASON.into())),
        }
    }
}

/// Durable CRUD with graceful degradation on store outages.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Store,
}

impl PersistenceGateway {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Never fails on an outage: a synthetic `demo-` record echoing the input
    /// is returned instead, marked degraded.
    pub async fn create_case(&self, input: NewCase) -> Result<Persisted<Case>, StoreError> {
        match self.store.create_case(&input).await {
            Ok(case) => Ok(Persisted::durable(case)),
            Err(StoreError::Unavailable(reason)) => {
                warn!(%reason, "store unavailable; returning synthetic case");
                Ok(Persisted::degraded(synthetic_case(input)))
            }
            Err(error) => Err(error),
        }
    }

    pub async fn get_case(&self, id: &str) -> Result<Case, StoreError> {
        self.store.get_case(id).await
    }

    /// Falls back to the fixed demo case set while the store is unreachable.
    pub async fn list_cases(&self, owner_id: &str) -> Result<Persisted<Vec<Case>>, StoreError> {
        match self.store.list_cases(owner_id).await {
            Ok(cases) => Ok(Persisted::durable(cases)),
            Err(StoreError::Unavailable(reason)) => {
                warn!(%reason, "store unavailable; returning demo cases");
                Ok(Persisted::degraded(demo::fallback_cases(owner_id)))
            }
            Err(error) => Err(error),
        }
    }

    /// A missing case with the store reachable is `Invalid`; an outage yields
    /// a synthetic document marked degraded.
    pub async fn create_document(
        &self,
        input: NewDocument,
    ) -> Result<Persisted<Document>, StoreError> {
        match self.store.create_document(&input).await {
            Ok(document) => Ok(Persisted::durable(document)),
            Err(StoreError::Unavailable(reason)) => {
                warn!(%reason, case_id = %input.case_id, "store unavailable; returning synthetic document");
                Ok(Persisted::degraded(synthetic_document(input)))
            }
            Err(error) => Err(error),
        }
    }

    pub async fn get_document(&self, id: &str) -> Result<Document, StoreError> {
        self.store.get_document(id).await
    }

    /// Applies only the supplied fields and bumps `updated_at`. Concurrent
    /// updates are last-write-wins.
    pub async fn update_document(
        &self,
        id: &str,
        changes: &DocumentChanges,
    ) -> Result<Document, StoreError> {
        self.store.update_document(id, changes).await
    }

    pub async fn delete_document(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete_document(id).await
    }

    pub async fn list_documents(
        &self,
        owner_id: &str,
        case_id: Option<&str>,
    ) -> Result<Persisted<Vec<Document>>, StoreError> {
        match self.store.list_documents(owner_id, case_id).await {
            Ok(documents) => Ok(Persisted::durable(documents)),
            Err(StoreError::Unavailable(reason)) => {
                warn!(%reason, "store unavailable; returning no documents");
                Ok(Persisted::degraded(Vec::new()))
            }
            Err(error) => Err(error),
        }
    }

    /// Used only by generation, which proceeds without a template on any error.
    pub async fn get_template(&self, id: &str) -> Result<Template, StoreError> {
        self.store.get_template(id).await
    }

    pub async fn list_templates(&self) -> Result<Persisted<Vec<Template>>, StoreError> {
        match self.store.list_templates().await {
            Ok(templates) => Ok(Persisted::durable(templates)),
            Err(StoreError::Unavailable(reason)) => {
                warn!(%reason, "store unavailable; returning no templates");
                Ok(Persisted::degraded(Vec::new()))
            }
            Err(error) => Err(error),
        }
    }

    /// Upsert the demo cases for `owner_id`.
    pub async fn seed_demo(&self, owner_id: &str) -> Result<usize, StoreError> {
        let cases = demo::seed_cases(owner_id);
        for case in &cases {
            self.store.upsert_case(case).await?;
        }
        Ok(cases.len())
    }
}

pub fn synthetic_id() -> String {
    format!("{SYNTHETIC_ID_PREFIX}{}", Uuid::new_v4().simple())
}

fn synthetic_case(input: NewCase) -> Case {
    let now = Utc::now();
    Case {
        id: synthetic_id(),
        title: input.title,
        client_name: input.client_name,
        category: input.category,
        description: input.description,
        status: input.status,
        owner_id: input.owner_id,
        created_at: now,
        updated_at: now,
        documents: Vec::new(),
    }
}

fn synthetic_document(input: NewDocument) -> Document {
    let now = Utc::now();
    Document {
        id: synthetic_id(),
        title: input.title,
        content: input.content,
        doc_type: input.doc_type,
        status: input.status,
        language: input.language,
        case_id: input.case_id,
        template_id: input.template_id,
        owner_id: input.owner_id,
        created_at: now,
        updated_at: now,
        case_summary: Some(CaseSummary {
            title: demo::PLACEHOLDER_CASE_TITLE.to_string(),
            category: CaseCategory::CryptoExchangeCompliance,
            client_name: demo::PLACEHOLDER_CLIENT_NAME.to_string(),
        }),
        template_summary: None,
    }
}

/// Classify a database error by whether the store could be reached.
pub(crate) fn classify_sqlx_error(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(error.to_string()),
        sqlx::Error::Database(db_error) => {
            let code = db_error.code().map(|code| code.into_owned()).unwrap_or_default();
            classify_sqlstate(&code, error.to_string())
        }
        _ => StoreError::Internal(error.to_string()),
    }
}

fn classify_migrate_error(error: MigrateError) -> StoreError {
    match error {
        MigrateError::Execute(error) => classify_sqlx_error(error),
        other => StoreError::Internal(other.to_string()),
    }
}

/// SQLSTATE classes 08 (connection), 53 (insufficient resources) and 57P
/// (operator intervention) mean the store is unreachable, as does 42P01 while
/// the schema has not been created yet; 23503 is a missing referenced record.
fn classify_sqlstate(code: &str, message: String) -> StoreError {
    let unreachable = code.starts_with("08") || code.starts_with("53") || code.starts_with("57P");
    if unreachable || code == "42P01" {
        StoreError::Unavailable(message)
    } else if code == "23503" {
        StoreError::Invalid(message)
    } else {
        StoreError::Internal(message)
    }
}
