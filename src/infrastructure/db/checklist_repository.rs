use crate::domain::checklist::{ChecklistTemplate, Question, Role, TemplateDraft};
use crate::domain::error::{AppError, Result};
use crate::domain::inspection::{Inspection, InspectionAnswer, InspectionFilter, InspectionStatus};
use crate::domain::ports::ChecklistRepository;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use std::collections::HashMap;

use super::connection::ChecklistDb;

const ROLE_TEMPLATE_IDS: &str = "SELECT id FROM checklist_templates WHERE role = ?";

pub struct SqliteChecklistRepository {
    pool: SqlitePool,
}

impl SqliteChecklistRepository {
    pub fn new(db: &ChecklistDb) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl ChecklistRepository for SqliteChecklistRepository {
    async fn publish_template(&self, draft: &TemplateDraft) -> Result<ChecklistTemplate> {
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to start template tx: {e}")))?;

        let version = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM checklist_templates WHERE role = ?",
        )
        .bind(draft.role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read template version: {e}")))?;

        deactivate_role(&mut tx, draft.role).await?;

        let template = ChecklistTemplate {
            id: draft.id.clone(),
            role: draft.role,
            version,
            is_active: true,
            created_at: draft.created_at,
        };

        sqlx::query(
            "INSERT INTO checklist_templates (id, role, version, is_active, created_at)
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(&template.id)
        .bind(template.role.as_str())
        .bind(template.version)
        .bind(template.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert template: {e}")))?;

        for question in &draft.questions {
            insert_question(&mut tx, &template.id, question).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit template tx: {e}")))?;

        Ok(template)
    }

    async fn list_templates(&self) -> Result<Vec<ChecklistTemplate>> {
        let rows = sqlx::query_as::<_, TemplateEntity>(
            "SELECT id, role, version, is_active, created_at
             FROM checklist_templates ORDER BY role ASC, version DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list templates: {e}")))?;

        rows.into_iter().map(ChecklistTemplate::try_from).collect()
    }

    async fn get_active_template(&self, role: Role) -> Result<Option<ChecklistTemplate>> {
        let row = sqlx::query_as::<_, TemplateEntity>(
            "SELECT id, role, version, is_active, created_at
             FROM checklist_templates WHERE role = ? AND is_active = 1
             ORDER BY version DESC LIMIT 1",
        )
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch active template: {e}")))?;

        row.map(ChecklistTemplate::try_from).transpose()
    }

    async fn get_template_by_id(&self, template_id: &str) -> Result<ChecklistTemplate> {
        let row = sqlx::query_as::<_, TemplateEntity>(
            "SELECT id, role, version, is_active, created_at
             FROM checklist_templates WHERE id = ?",
        )
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch template: {e}")))?;

        match row {
            Some(entity) => entity.try_into(),
            None => Err(AppError::NotFound(format!(
                "Template not found: {}",
                template_id
            ))),
        }
    }

    async fn get_questions_by_template_id(&self, template_id: &str) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionEntity>(
            "SELECT id, template_id, text, \"order\" AS position, min_photos, max_photos,
                    is_required, reference_images_json, created_at
             FROM questions WHERE template_id = ? ORDER BY \"order\" ASC",
        )
        .bind(template_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list questions: {e}")))?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn deactivate_templates_by_role(&self, role: Role) -> Result<u64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {e}")))?;

        deactivate_role(&mut conn, role).await
    }

    async fn delete_templates_by_role(&self, role: Role) -> Result<u64> {
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to start retire tx: {e}")))?;

        let role_inspections = format!(
            "SELECT id FROM inspections WHERE template_id IN ({ROLE_TEMPLATE_IDS})"
        );
        let role_questions =
            format!("SELECT id FROM questions WHERE template_id IN ({ROLE_TEMPLATE_IDS})");
        let role_answers = format!(
            "SELECT id FROM inspection_answers
             WHERE inspection_id IN ({role_inspections}) OR question_id IN ({role_questions})"
        );

        let statements = [
            (
                format!("DELETE FROM answer_photos WHERE answer_id IN ({role_answers})"),
                2,
            ),
            (
                format!(
                    "DELETE FROM inspection_answers
                     WHERE inspection_id IN ({role_inspections}) OR question_id IN ({role_questions})"
                ),
                2,
            ),
            (
                format!("DELETE FROM inspections WHERE template_id IN ({ROLE_TEMPLATE_IDS})"),
                1,
            ),
            (
                format!("DELETE FROM questions WHERE template_id IN ({ROLE_TEMPLATE_IDS})"),
                1,
            ),
        ];

        for (sql, role_binds) in &statements {
            let mut query = sqlx::query(sql);
            for _ in 0..*role_binds {
                query = query.bind(role.as_str());
            }
            query.execute(&mut *tx).await.map_err(|e| {
                AppError::DatabaseError(format!("Failed to purge {} records: {e}", role))
            })?;
        }

        let removed = sqlx::query("DELETE FROM checklist_templates WHERE role = ?")
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete templates: {e}")))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit retire tx: {e}")))?;

        Ok(removed)
    }

    async fn create_inspection(&self, inspection: &Inspection) -> Result<()> {
        sqlx::query(
            "INSERT INTO inspections (id, template_id, machine_serial, inspector_name, status, started_at, finished_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&inspection.id)
        .bind(&inspection.template_id)
        .bind(&inspection.machine_serial)
        .bind(&inspection.inspector_name)
        .bind(inspection.status.as_str())
        .bind(inspection.started_at)
        .bind(inspection.finished_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert inspection: {e}")))?;

        Ok(())
    }

    async fn get_inspection_by_id(&self, inspection_id: &str) -> Result<Inspection> {
        let row = sqlx::query_as::<_, InspectionEntity>(
            "SELECT id, template_id, machine_serial, inspector_name, status, started_at, finished_at
             FROM inspections WHERE id = ?",
        )
        .bind(inspection_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch inspection: {e}")))?;

        match row {
            Some(entity) => entity.try_into(),
            None => Err(AppError::NotFound(format!(
                "Inspection not found: {}",
                inspection_id
            ))),
        }
    }

    async fn list_inspections(&self, filter: &InspectionFilter) -> Result<Vec<Inspection>> {
        let mut sql = String::from(
            "SELECT i.id, i.template_id, i.machine_serial, i.inspector_name, i.status,
                    i.started_at, i.finished_at
             FROM inspections i
             INNER JOIN checklist_templates t ON i.template_id = t.id
             WHERE 1 = 1",
        );

        if filter.role.is_some() {
            sql.push_str(" AND t.role = ?");
        }

        if filter.status.is_some() {
            sql.push_str(" AND i.status = ?");
        }

        sql.push_str(" ORDER BY i.started_at DESC, i.rowid DESC");

        let mut qb = sqlx::query_as::<_, InspectionEntity>(&sql);
        if let Some(role) = filter.role {
            qb = qb.bind(role.as_str());
        }
        if let Some(status) = filter.status {
            qb = qb.bind(status.as_str());
        }

        let rows = qb
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list inspections: {e}")))?;

        rows.into_iter().map(Inspection::try_from).collect()
    }

    async fn get_answers_by_inspection(&self, inspection_id: &str) -> Result<Vec<InspectionAnswer>> {
        let answers = sqlx::query_as::<_, AnswerEntity>(
            "SELECT id, inspection_id, question_id, comment, created_at
             FROM inspection_answers WHERE inspection_id = ? ORDER BY created_at ASC",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list answers: {e}")))?;

        let photo_rows = sqlx::query_as::<_, (String, String)>(
            "SELECT ap.answer_id, ap.photo_key
             FROM answer_photos ap
             INNER JOIN inspection_answers ia ON ia.id = ap.answer_id
             WHERE ia.inspection_id = ?
             ORDER BY ap.answer_id ASC, ap.position ASC",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list answer photos: {e}")))?;

        let mut photos: HashMap<String, Vec<String>> = HashMap::new();
        for (answer_id, photo_key) in photo_rows {
            photos.entry(answer_id).or_default().push(photo_key);
        }

        Ok(answers
            .into_iter()
            .map(|entity| {
                let answer_photos = photos.remove(&entity.id).unwrap_or_default();
                InspectionAnswer {
                    id: entity.id,
                    inspection_id: entity.inspection_id,
                    question_id: entity.question_id,
                    comment: entity.comment,
                    photos: answer_photos,
                    created_at: entity.created_at,
                }
            })
            .collect())
    }

    async fn upsert_answer(&self, answer: &InspectionAnswer) -> Result<InspectionAnswer> {
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to start answer tx: {e}")))?;

        let status = sqlx::query_scalar::<_, String>("SELECT status FROM inspections WHERE id = ?")
            .bind(&answer.inspection_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read inspection status: {e}")))?;

        match status.as_deref() {
            None => {
                return Err(AppError::NotFound(format!(
                    "Inspection not found: {}",
                    answer.inspection_id
                )))
            }
            Some(status) if status == InspectionStatus::Completed.as_str() => {
                return Err(AppError::AlreadyCompleted(format!(
                    "Inspection {} no longer accepts answers",
                    answer.inspection_id
                )))
            }
            Some(_) => {}
        }

        sqlx::query(
            "INSERT INTO inspection_answers (id, inspection_id, question_id, comment, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(inspection_id, question_id) DO UPDATE SET comment = excluded.comment",
        )
        .bind(&answer.id)
        .bind(&answer.inspection_id)
        .bind(&answer.question_id)
        .bind(&answer.comment)
        .bind(answer.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to upsert answer: {e}")))?;

        let (answer_id, created_at) = sqlx::query_as::<_, (String, i64)>(
            "SELECT id, created_at FROM inspection_answers WHERE inspection_id = ? AND question_id = ?",
        )
        .bind(&answer.inspection_id)
        .bind(&answer.question_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read stored answer: {e}")))?;

        sqlx::query("DELETE FROM answer_photos WHERE answer_id = ?")
            .bind(&answer_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to clear answer photos: {e}")))?;

        for (position, photo_key) in answer.photos.iter().enumerate() {
            sqlx::query("INSERT INTO answer_photos (answer_id, position, photo_key) VALUES (?, ?, ?)")
                .bind(&answer_id)
                .bind(position as i64)
                .bind(photo_key)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to insert answer photo: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit answer tx: {e}")))?;

        Ok(InspectionAnswer {
            id: answer_id,
            created_at,
            ..answer.clone()
        })
    }

    async fn complete_inspection(&self, inspection_id: &str, finished_at: i64) -> Result<Inspection> {
        self.finish_inspection(inspection_id, finished_at, false).await
    }

    async fn complete_inspection_checked(
        &self,
        inspection_id: &str,
        finished_at: i64,
    ) -> Result<Inspection> {
        self.finish_inspection(inspection_id, finished_at, true).await
    }
}

impl SqliteChecklistRepository {
    /// Status guard, optional required-answer check and the status flip share one
    /// write transaction, so no answer can change between check and update.
    async fn finish_inspection(
        &self,
        inspection_id: &str,
        finished_at: i64,
        require_answers: bool,
    ) -> Result<Inspection> {
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to start completion tx: {e}")))?;

        let row = sqlx::query_as::<_, InspectionEntity>(
            "SELECT id, template_id, machine_serial, inspector_name, status, started_at, finished_at
             FROM inspections WHERE id = ?",
        )
        .bind(inspection_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch inspection: {e}")))?;

        let mut inspection = match row {
            Some(entity) => Inspection::try_from(entity)?,
            None => {
                return Err(AppError::NotFound(format!(
                    "Inspection not found: {}",
                    inspection_id
                )))
            }
        };
        if inspection.is_completed() {
            return Err(AppError::AlreadyCompleted(format!(
                "Inspection {} is already completed",
                inspection_id
            )));
        }

        if require_answers {
            let unmet = unmet_required_questions(&mut tx, &inspection).await?;
            if !unmet.is_empty() {
                let orders: Vec<String> = unmet.iter().map(|order| order.to_string()).collect();
                return Err(AppError::ValidationError(format!(
                    "Required questions not satisfied: {}",
                    orders.join(", ")
                )));
            }
        }

        let result = sqlx::query(
            "UPDATE inspections SET status = ?, finished_at = ? WHERE id = ? AND status = ?",
        )
        .bind(InspectionStatus::Completed.as_str())
        .bind(finished_at)
        .bind(inspection_id)
        .bind(InspectionStatus::InProgress.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to complete inspection: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::AlreadyCompleted(format!(
                "Inspection {} is already completed",
                inspection_id
            )));
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit completion tx: {e}")))?;

        inspection.status = InspectionStatus::Completed;
        inspection.finished_at = Some(finished_at);
        Ok(inspection)
    }
}

/// Orders of required questions with no answer, or with a photo count outside
/// [min_photos, max_photos].
async fn unmet_required_questions(
    conn: &mut SqliteConnection,
    inspection: &Inspection,
) -> Result<Vec<i64>> {
    let rows = sqlx::query_as::<_, RequiredQuestionRow>(
        "SELECT q.\"order\" AS position, q.min_photos, q.max_photos,
                a.id IS NOT NULL AS answered, COUNT(ap.position) AS photos
         FROM questions q
         LEFT JOIN inspection_answers a ON a.question_id = q.id AND a.inspection_id = ?
         LEFT JOIN answer_photos ap ON ap.answer_id = a.id
         WHERE q.template_id = ? AND q.is_required = 1
         GROUP BY q.id
         ORDER BY q.\"order\" ASC",
    )
    .bind(&inspection.id)
    .bind(&inspection.template_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to check required answers: {e}")))?;

    Ok(rows
        .into_iter()
        .filter(|row| {
            row.answered == 0 || row.photos < row.min_photos || row.photos > row.max_photos
        })
        .map(|row| row.position)
        .collect())
}

async fn deactivate_role(conn: &mut SqliteConnection, role: Role) -> Result<u64> {
    let result =
        sqlx::query("UPDATE checklist_templates SET is_active = 0 WHERE role = ? AND is_active = 1")
            .bind(role.as_str())
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to deactivate templates: {e}")))?;

    Ok(result.rows_affected())
}

async fn insert_question(
    conn: &mut SqliteConnection,
    template_id: &str,
    question: &Question,
) -> Result<()> {
    let reference_images_json = serde_json::to_string(&question.reference_images)
        .map_err(|e| AppError::Internal(format!("Failed to encode reference images: {e}")))?;

    sqlx::query(
        "INSERT INTO questions (id, template_id, text, \"order\", min_photos, max_photos, is_required, reference_images_json, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&question.id)
    .bind(template_id)
    .bind(&question.text)
    .bind(question.order)
    .bind(question.min_photos)
    .bind(question.max_photos)
    .bind(if question.is_required { 1 } else { 0 })
    .bind(reference_images_json)
    .bind(question.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to insert question: {e}")))?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct RequiredQuestionRow {
    position: i64,
    min_photos: i64,
    max_photos: i64,
    answered: i64,
    photos: i64,
}

#[derive(sqlx::FromRow)]
struct TemplateEntity {
    id: String,
    role: String,
    version: i64,
    is_active: i64,
    created_at: i64,
}

impl TryFrom<TemplateEntity> for ChecklistTemplate {
    type Error = AppError;

    fn try_from(entity: TemplateEntity) -> Result<Self> {
        let role = entity.role.parse::<Role>().map_err(|_| {
            AppError::DatabaseError(format!(
                "Template {} has unknown role {}",
                entity.id, entity.role
            ))
        })?;

        Ok(Self {
            id: entity.id,
            role,
            version: entity.version,
            is_active: entity.is_active != 0,
            created_at: entity.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QuestionEntity {
    id: String,
    template_id: String,
    text: String,
    position: i64,
    min_photos: i64,
    max_photos: i64,
    is_required: i64,
    reference_images_json: String,
    created_at: i64,
}

impl TryFrom<QuestionEntity> for Question {
    type Error = AppError;

    fn try_from(entity: QuestionEntity) -> Result<Self> {
        let reference_images = serde_json::from_str(&entity.reference_images_json).map_err(|e| {
            AppError::DatabaseError(format!(
                "Question {} has malformed reference images: {e}",
                entity.id
            ))
        })?;

        Ok(Self {
            id: entity.id,
            template_id: entity.template_id,
            text: entity.text,
            order: entity.position,
            min_photos: entity.min_photos,
            max_photos: entity.max_photos,
            is_required: entity.is_required != 0,
            reference_images,
            created_at: entity.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InspectionEntity {
    id: String,
    template_id: String,
    machine_serial: String,
    inspector_name: String,
    status: String,
    started_at: i64,
    finished_at: Option<i64>,
}

impl TryFrom<InspectionEntity> for Inspection {
    type Error = AppError;

    fn try_from(entity: InspectionEntity) -> Result<Self> {
        let status = entity.status.parse::<InspectionStatus>().map_err(|_| {
            AppError::DatabaseError(format!(
                "Inspection {} has unknown status {}",
                entity.id, entity.status
            ))
        })?;

        Ok(Self {
            id: entity.id,
            template_id: entity.template_id,
            machine_serial: entity.machine_serial,
            inspector_name: entity.inspector_name,
            status,
            started_at: entity.started_at,
            finished_at: entity.finished_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AnswerEntity {
    id: String,
    inspection_id: String,
    question_id: String,
    comment: String,
    created_at: i64,
}
