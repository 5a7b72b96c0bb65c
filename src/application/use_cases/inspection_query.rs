use crate::domain::error::Result;
use crate::domain::inspection::{
    AnswerView, Inspection, InspectionAnswer, InspectionAnswerDetail, InspectionDetail,
    InspectionFilter, PhotoView,
};
use crate::domain::ports::{ChecklistRepository, PhotoStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct InspectionQueryUseCase {
    repository: Arc<dyn ChecklistRepository>,
    photo_store: Arc<dyn PhotoStore>,
    photo_namespace: String,
}

impl InspectionQueryUseCase {
    pub fn new(
        repository: Arc<dyn ChecklistRepository>,
        photo_store: Arc<dyn PhotoStore>,
        photo_namespace: String,
    ) -> Self {
        Self {
            repository,
            photo_store,
            photo_namespace,
        }
    }

    /// Full read model for review: every question of the inspection's template paired
    /// with its answer, if any. A photo whose URL cannot be resolved keeps its key and
    /// drops the URL instead of failing the whole detail.
    pub async fn get_inspection_detail(&self, inspection_id: &str) -> Result<InspectionDetail> {
        let inspection = self.repository.get_inspection_by_id(inspection_id).await?;
        let template = self
            .repository
            .get_template_by_id(&inspection.template_id)
            .await?;
        let questions = self
            .repository
            .get_questions_by_template_id(&template.id)
            .await?;

        let mut answers: HashMap<String, InspectionAnswer> = self
            .repository
            .get_answers_by_inspection(inspection_id)
            .await?
            .into_iter()
            .map(|answer| (answer.question_id.clone(), answer))
            .collect();

        let mut entries = Vec::with_capacity(questions.len());
        for question in questions {
            let answer = match answers.remove(&question.id) {
                Some(answer) => Some(self.answer_view(answer).await),
                None => None,
            };
            entries.push(InspectionAnswerDetail { question, answer });
        }

        Ok(InspectionDetail {
            inspection,
            role: template.role,
            template_version: template.version,
            answers: entries,
        })
    }

    /// Newest first.
    pub async fn list_inspections(&self, filter: &InspectionFilter) -> Result<Vec<Inspection>> {
        self.repository.list_inspections(filter).await
    }

    async fn answer_view(&self, answer: InspectionAnswer) -> AnswerView {
        let mut photos = Vec::with_capacity(answer.photos.len());
        for key in answer.photos {
            let url = match self.photo_store.resolve_url(&self.photo_namespace, &key).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, answer_id = %answer.id, key = %key, "Failed to resolve photo URL");
                    None
                }
            };
            photos.push(PhotoView { key, url });
        }

        AnswerView {
            id: answer.id,
            comment: answer.comment,
            photos,
            created_at: answer.created_at,
        }
    }
}
