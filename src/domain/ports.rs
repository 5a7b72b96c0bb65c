//! Boundaries the core depends on: durable storage and blob storage.

use crate::domain::checklist::{ChecklistTemplate, Question, Role, TemplateDraft};
use crate::domain::error::Result;
use crate::domain::inspection::{Inspection, InspectionAnswer, InspectionFilter};
use async_trait::async_trait;

#[async_trait]
pub trait ChecklistRepository: Send + Sync {
    /// Deactivates every template of the draft's role and stores the draft as the
    /// single active version, all in one transaction. The version is assigned here.
    async fn publish_template(&self, draft: &TemplateDraft) -> Result<ChecklistTemplate>;
    async fn list_templates(&self) -> Result<Vec<ChecklistTemplate>>;
    async fn get_active_template(&self, role: Role) -> Result<Option<ChecklistTemplate>>;
    async fn get_template_by_id(&self, template_id: &str) -> Result<ChecklistTemplate>;
    /// Ordered by `order` ascending.
    async fn get_questions_by_template_id(&self, template_id: &str) -> Result<Vec<Question>>;
    async fn deactivate_templates_by_role(&self, role: Role) -> Result<u64>;
    /// Removes the role's templates with their questions, inspections, answers and
    /// photo references. Returns the number of templates removed.
    async fn delete_templates_by_role(&self, role: Role) -> Result<u64>;

    async fn create_inspection(&self, inspection: &Inspection) -> Result<()>;
    async fn get_inspection_by_id(&self, inspection_id: &str) -> Result<Inspection>;
    /// Newest first.
    async fn list_inspections(&self, filter: &InspectionFilter) -> Result<Vec<Inspection>>;
    async fn get_answers_by_inspection(&self, inspection_id: &str) -> Result<Vec<InspectionAnswer>>;
    /// Inserts or replaces the answer for (inspection, question), swapping its whole
    /// photo set atomically. Returns the stored answer.
    async fn upsert_answer(&self, answer: &InspectionAnswer) -> Result<InspectionAnswer>;
    async fn complete_inspection(&self, inspection_id: &str, finished_at: i64) -> Result<Inspection>;
    /// Like `complete_inspection`, but fails with `ValidationError` unless every
    /// required question has an answer within its photo bounds. Check and update
    /// are atomic.
    async fn complete_inspection_checked(
        &self,
        inspection_id: &str,
        finished_at: i64,
    ) -> Result<Inspection>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Stores `data` under `key`, overwriting any previous blob. Returns the stored key.
    async fn upload(&self, namespace: &str, key: &str, data: &[u8]) -> Result<String>;
    async fn resolve_url(&self, namespace: &str, key: &str) -> Result<String>;
}
