use crate::domain::checklist::{
    ChecklistTemplate, Question, QuestionInput, Role, TemplateDraft, TemplateWithQuestions,
};
use crate::domain::error::{AppError, Result};
use crate::domain::ports::ChecklistRepository;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

pub struct TemplateUseCase {
    repository: Arc<dyn ChecklistRepository>,
}

impl TemplateUseCase {
    pub fn new(repository: Arc<dyn ChecklistRepository>) -> Self {
        Self { repository }
    }

    /// Publishes a new version of the role's checklist. Any previously active version
    /// is deactivated in the same transaction.
    pub async fn create_template(
        &self,
        role: Role,
        questions: Vec<QuestionInput>,
    ) -> Result<TemplateWithQuestions> {
        validate_questions(&questions)?;

        let template_id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp_millis();

        let mut questions: Vec<Question> = questions
            .into_iter()
            .map(|input| Question {
                id: Uuid::new_v4().to_string(),
                template_id: template_id.clone(),
                text: input.text.trim().to_string(),
                order: input.order,
                min_photos: input.min_photos,
                max_photos: input.max_photos,
                is_required: input.is_required,
                reference_images: input.reference_images,
                created_at,
            })
            .collect();
        questions.sort_by_key(|question| question.order);

        let draft = TemplateDraft {
            id: template_id,
            role,
            created_at,
            questions,
        };

        let template = self.repository.publish_template(&draft).await.map_err(|e| {
            error!(error = %e, role = %role, "Failed to publish checklist template");
            e
        })?;

        info!(
            role = %role,
            template_id = %template.id,
            version = template.version,
            questions = draft.questions.len(),
            "Published checklist template"
        );

        Ok(TemplateWithQuestions {
            template,
            questions: draft.questions,
        })
    }

    pub async fn list_templates(&self) -> Result<Vec<ChecklistTemplate>> {
        self.repository.list_templates().await
    }

    pub async fn get_active_template(&self, role: Role) -> Result<TemplateWithQuestions> {
        let template = self
            .repository
            .get_active_template(role)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No active template for role {}", role)))?;

        let questions = self
            .repository
            .get_questions_by_template_id(&template.id)
            .await?;

        Ok(TemplateWithQuestions {
            template,
            questions,
        })
    }

    /// Any version, active or superseded.
    pub async fn get_template(&self, template_id: &str) -> Result<TemplateWithQuestions> {
        let template = self.repository.get_template_by_id(template_id).await?;
        let questions = self
            .repository
            .get_questions_by_template_id(&template.id)
            .await?;

        Ok(TemplateWithQuestions {
            template,
            questions,
        })
    }

    /// Takes the role offline without deleting history.
    pub async fn deactivate_role(&self, role: Role) -> Result<u64> {
        let changed = self.repository.deactivate_templates_by_role(role).await?;
        info!(role = %role, changed, "Deactivated checklist templates");
        Ok(changed)
    }

    /// Destructive purge of every template of the role and everything recorded
    /// against it. Meant for test and seed environments.
    pub async fn retire_template(&self, role: Role) -> Result<u64> {
        let removed = self.repository.delete_templates_by_role(role).await?;
        warn!(role = %role, removed, "Purged checklist templates and their inspections");
        Ok(removed)
    }
}

fn validate_questions(questions: &[QuestionInput]) -> Result<()> {
    if questions.is_empty() {
        return Err(AppError::ValidationError(
            "A template needs at least one question.".to_string(),
        ));
    }

    let mut orders = HashSet::new();
    for question in questions {
        question.validate()?;
        if question.text.trim().is_empty() {
            return Err(AppError::ValidationError(format!(
                "Question {} has blank text.",
                question.order
            )));
        }
        if !orders.insert(question.order) {
            return Err(AppError::ValidationError(format!(
                "Question order {} is used more than once.",
                question.order
            )));
        }
    }

    Ok(())
}
