use crate::domain::checklist::{Question, Role};
use crate::domain::error::{AppError, Result};
use crate::domain::inspection::{
    is_final_step, question_at_step, Inspection, InspectionAnswer, InspectionStatus,
};
use crate::domain::ports::{ChecklistRepository, PhotoStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StartedInspection {
    pub inspection: Inspection,
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StepOutcome {
    Next { step: usize },
    Completed { inspection: Inspection },
}

pub struct InspectionUseCase {
    repository: Arc<dyn ChecklistRepository>,
    photo_store: Arc<dyn PhotoStore>,
    photo_namespace: String,
    strict_completion: bool,
}

impl InspectionUseCase {
    pub fn new(
        repository: Arc<dyn ChecklistRepository>,
        photo_store: Arc<dyn PhotoStore>,
        photo_namespace: String,
        strict_completion: bool,
    ) -> Self {
        Self {
            repository,
            photo_store,
            photo_namespace,
            strict_completion,
        }
    }

    pub async fn start_inspection(
        &self,
        role: Role,
        machine_serial: String,
        inspector_name: String,
    ) -> Result<StartedInspection> {
        let machine_serial = machine_serial.trim().to_string();
        let inspector_name = inspector_name.trim().to_string();
        if machine_serial.is_empty() {
            return Err(AppError::ValidationError(
                "Machine serial is required.".to_string(),
            ));
        }
        if inspector_name.is_empty() {
            return Err(AppError::ValidationError(
                "Inspector name is required.".to_string(),
            ));
        }

        let template = self
            .repository
            .get_active_template(role)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No active template for role {}", role)))?;

        let questions = self
            .repository
            .get_questions_by_template_id(&template.id)
            .await?;

        let inspection = Inspection {
            id: Uuid::new_v4().to_string(),
            template_id: template.id.clone(),
            machine_serial,
            inspector_name,
            status: InspectionStatus::InProgress,
            started_at: chrono::Utc::now().timestamp_millis(),
            finished_at: None,
        };

        self.repository.create_inspection(&inspection).await?;

        info!(
            inspection_id = %inspection.id,
            role = %role,
            template_version = template.version,
            steps = questions.len(),
            "Started inspection"
        );

        Ok(StartedInspection {
            inspection,
            questions,
        })
    }

    /// Records (or replaces) the answer for one question. Photo-count bounds are
    /// not enforced here.
    pub async fn save_answer(
        &self,
        inspection_id: &str,
        question_id: &str,
        comment: String,
        photos: &[Vec<u8>],
    ) -> Result<InspectionAnswer> {
        let inspection = self.open_inspection(inspection_id).await?;
        let questions = self
            .repository
            .get_questions_by_template_id(&inspection.template_id)
            .await?;

        let question = questions
            .iter()
            .find(|question| question.id == question_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Question {} is not part of inspection {}",
                    question_id, inspection_id
                ))
            })?;

        self.persist_answer(&inspection, question, comment, photos)
            .await
    }

    /// Answers the question at `step` (1-indexed) and completes the inspection when
    /// that was the last step.
    pub async fn submit_step(
        &self,
        inspection_id: &str,
        step: usize,
        comment: String,
        photos: &[Vec<u8>],
    ) -> Result<StepOutcome> {
        let inspection = self.open_inspection(inspection_id).await?;
        let questions = self
            .repository
            .get_questions_by_template_id(&inspection.template_id)
            .await?;

        let question = question_at_step(&questions, step).ok_or_else(|| {
            AppError::NotFound(format!(
                "Step {} is outside 1..={} for inspection {}",
                step,
                questions.len(),
                inspection_id
            ))
        })?;

        self.persist_answer(&inspection, question, comment, photos)
            .await?;

        if is_final_step(step, questions.len()) {
            let inspection = self.complete_inspection(inspection_id).await?;
            Ok(StepOutcome::Completed { inspection })
        } else {
            Ok(StepOutcome::Next { step: step + 1 })
        }
    }

    pub async fn complete_inspection(&self, inspection_id: &str) -> Result<Inspection> {
        let finished_at = chrono::Utc::now().timestamp_millis();
        let completed = if self.strict_completion {
            self.repository
                .complete_inspection_checked(inspection_id, finished_at)
                .await
        } else {
            self.repository
                .complete_inspection(inspection_id, finished_at)
                .await
        };
        let inspection = completed.map_err(|e| {
            warn!(error = %e, inspection_id, "Inspection not completed");
            e
        })?;

        info!(inspection_id = %inspection.id, "Completed inspection");
        Ok(inspection)
    }

    pub async fn get_inspection(&self, inspection_id: &str) -> Result<Inspection> {
        self.repository.get_inspection_by_id(inspection_id).await
    }

    /// The inspection together with the role of the template it runs against.
    pub async fn get_inspection_with_role(&self, inspection_id: &str) -> Result<(Inspection, Role)> {
        let inspection = self.repository.get_inspection_by_id(inspection_id).await?;
        let template = self
            .repository
            .get_template_by_id(&inspection.template_id)
            .await?;
        Ok((inspection, template.role))
    }

    pub async fn get_inspection_questions(&self, inspection_id: &str) -> Result<Vec<Question>> {
        let inspection = self.repository.get_inspection_by_id(inspection_id).await?;
        self.repository
            .get_questions_by_template_id(&inspection.template_id)
            .await
    }

    async fn open_inspection(&self, inspection_id: &str) -> Result<Inspection> {
        let inspection = self.repository.get_inspection_by_id(inspection_id).await?;
        if inspection.is_completed() {
            warn!(inspection_id, "Rejected answer for completed inspection");
            return Err(AppError::AlreadyCompleted(format!(
                "Inspection {} no longer accepts answers",
                inspection_id
            )));
        }
        Ok(inspection)
    }

    async fn persist_answer(
        &self,
        inspection: &Inspection,
        question: &Question,
        comment: String,
        photos: &[Vec<u8>],
    ) -> Result<InspectionAnswer> {
        if !question.accepts_photo_count(photos.len()) {
            info!(
                inspection_id = %inspection.id,
                question_id = %question.id,
                photos = photos.len(),
                min = question.min_photos,
                max = question.max_photos,
                "Answer photo count outside question bounds"
            );
        }

        let mut photo_keys = Vec::with_capacity(photos.len());
        for (index, data) in photos.iter().enumerate() {
            let key = photo_key(&inspection.id, &question.id, index);
            let stored = self
                .photo_store
                .upload(&self.photo_namespace, &key, data)
                .await
                .map_err(|e| {
                    error!(error = %e, inspection_id = %inspection.id, key = %key, "Photo upload failed");
                    e
                })?;
            photo_keys.push(stored);
        }

        let answer = InspectionAnswer {
            id: Uuid::new_v4().to_string(),
            inspection_id: inspection.id.clone(),
            question_id: question.id.clone(),
            comment,
            photos: photo_keys,
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        let stored = self.repository.upsert_answer(&answer).await.map_err(|e| {
            error!(error = %e, inspection_id = %inspection.id, question_id = %question.id, "Failed to save answer");
            e
        })?;

        info!(
            inspection_id = %inspection.id,
            question_id = %question.id,
            order = question.order,
            photos = stored.photos.len(),
            "Saved answer"
        );
        Ok(stored)
    }
}

/// Same slot, same key: a resubmission overwrites slot by slot. Slots beyond a
/// shorter resubmission keep their old blob, which is no longer referenced.
pub fn photo_key(inspection_id: &str, question_id: &str, index: usize) -> String {
    format!("inspections/{}/{}/{}.jpg", inspection_id, question_id, index)
}
