use std::collections::HashMap;

use chrono::Utc;
use gpulaw_common::types::{Case, CaseSummary, Document, DocumentSummary, Template, TemplateSummary};
use uuid::Uuid;

use super::{DocumentChanges, NewCase, NewDocument, StoreError};

/// In-process store used by tests. `reachable = false` simulates an outage.
#[derive(Debug)]
pub struct MemoryStore {
    reachable: bool,
    cases: HashMap<String, Case>,
    documents: HashMap<String, Document>,
    templates: HashMap<String, Template>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            reachable: true,
            cases: HashMap::new(),
            documents: HashMap::new(),
            templates: HashMap::new(),
        }
    }
}

impl MemoryStore {
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    pub fn insert_template(&mut self, template: Template) {
        self.templates.insert(template.id.clone(), template);
    }

    fn ensure_reachable(&self) -> Result<(), StoreError> {
        if self.reachable {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store marked unreachable".to_string()))
        }
    }

    pub(super) fn create_case(&mut self, input: &NewCase) -> Result<Case, StoreError> {
        self.ensure_reachable()?;
        let now = Utc::now();
        let case = Case {
            id: Uuid::new_v4().to_string(),
            title: input.title.clone(),
            client_name: input.client_name.clone(),
            category: input.category,
            description: input.description.clone(),
            status: input.status,
            owner_id: input.owner_id.clone(),
            created_at: now,
            updated_at: now,
            documents: Vec::new(),
        };
        self.cases.insert(case.id.clone(), case.clone());
        Ok(case)
    }

    pub(super) fn upsert_case(&mut self, case: &Case) -> Result<(), StoreError> {
        self.ensure_reachable()?;
        self.cases.insert(case.id.clone(), Case { documents: Vec::new(), ..case.clone() });
        Ok(())
    }

    pub(super) fn get_case(&self, id: &str) -> Result<Case, StoreError> {
        self.ensure_reachable()?;
        self.cases.get(id).cloned().ok_or(StoreError::NotFound)
    }

    pub(super) fn list_cases(&self, owner_id: &str) -> Result<Vec<Case>, StoreError> {
        self.ensure_reachable()?;
        let mut cases: Vec<Case> = self
            .cases
            .values()
            .filter(|case| case.owner_id == owner_id)
            .map(|case| Case { documents: self.summaries_for(&case.id), ..case.clone() })
            .collect();
        cases.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
        Ok(cases)
    }

    fn summaries_for(&self, case_id: &str) -> Vec<DocumentSummary> {
        let mut documents: Vec<&Document> =
            self.documents.values().filter(|document| document.case_id == case_id).collect();
        documents.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
        documents
            .into_iter()
            .map(|document| DocumentSummary {
                id: document.id.clone(),
                title: document.title.clone(),
                status: document.status,
            })
            .collect()
    }

    pub(super) fn create_document(&mut self, input: &NewDocument) -> Result<Document, StoreError> {
        self.ensure_reachable()?;
        if !self.cases.contains_key(&input.case_id) {
            return Err(StoreError::Invalid(format!("case '{}' does not exist", input.case_id)));
        }
        if let Some(template_id) = &input.template_id {
            if !self.templates.contains_key(template_id) {
                return Err(StoreError::Invalid(format!("template '{template_id}' does not exist")));
            }
        }

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4().to_string(),
            title: input.title.clone(),
            content: input.content.clone(),
            doc_type: input.doc_type,
            status: input.status,
            language: input.language,
            case_id: input.case_id.clone(),
            template_id: input.template_id.clone(),
            owner_id: input.owner_id.clone(),
            created_at: now,
            updated_at: now,
            case_summary: None,
            template_summary: None,
        };
        let id = document.id.clone();
        self.documents.insert(id.clone(), document);
        self.get_document_unchecked(&id)
    }

    pub(super) fn get_document(&self, id: &str) -> Result<Document, StoreError> {
        self.ensure_reachable()?;
        self.get_document_unchecked(id)
    }

    fn get_document_unchecked(&self, id: &str) -> Result<Document, StoreError> {
        let document = self.documents.get(id).ok_or(StoreError::NotFound)?;
        Ok(self.with_summaries(document.clone()))
    }

    fn with_summaries(&self, mut document: Document) -> Document {
        document.case_summary = self.cases.get(&document.case_id).map(|case| CaseSummary {
            title: case.title.clone(),
            category: case.category,
            client_name: case.client_name.clone(),
        });
        document.template_summary = document
            .template_id
            .as_ref()
            .and_then(|id| self.templates.get(id))
            .map(|template| TemplateSummary { name: template.name.clone() });
        document
    }

    pub(super) fn update_document(
        &mut self,
        id: &str,
        changes: &DocumentChanges,
    ) -> Result<Document, StoreError> {
        self.ensure_reachable()?;
        let document = self.documents.get_mut(id).ok_or(StoreError::NotFound)?;
        if let Some(title) = &changes.title {
            document.title = title.clone();
        }
        if let Some(content) = &changes.content {
            document.content = content.clone();
        }
        if let Some(status) = changes.status {
            document.status = status;
        }
        if let Some(doc_type) = changes.doc_type {
            document.doc_type = doc_type;
        }
        if let Some(language) = changes.language {
            document.language = language;
        }
        document.updated_at = Utc::now();
        self.get_document_unchecked(id)
    }

    pub(super) fn delete_document(&mut self, id: &str) -> Result<(), StoreError> {
        self.ensure_reachable()?;
        self.documents.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    pub(super) fn list_documents(
        &self,
        owner_id: &str,
        case_id: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        self.ensure_reachable()?;
        let mut documents: Vec<Document> = self
            .documents
            .values()
            .filter(|document| document.owner_id == owner_id)
            .filter(|document| case_id.map_or(true, |case_id| document.case_id == case_id))
            .map(|document| self.with_summaries(document.clone()))
            .collect();
        documents.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
        Ok(documents)
    }

    pub(super) fn get_template(&self, id: &str) -> Result<Template, StoreError> {
        self.ensure_reachable()?;
        self.templates.get(id).cloned().ok_or(StoreError::NotFound)
    }

    pub(super) fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        self.ensure_reachable()?;
        let mut templates: Vec<Template> = self.templates.values().cloned().collect();
        templates.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(templates)
    }
}
