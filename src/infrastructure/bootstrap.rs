use std::sync::Arc;

use tracing::{error, info};

use crate::application::{InspectionQueryUseCase, InspectionUseCase, TemplateUseCase};
use crate::domain::error::Result;
use crate::domain::ports::{ChecklistRepository, PhotoStore};
use crate::infrastructure::config::Settings;
use crate::infrastructure::db::checklist_repository::SqliteChecklistRepository;
use crate::infrastructure::db::connection::ChecklistDb;
use crate::infrastructure::photo_store::FileSystemPhotoStore;

/// Everything a delivery layer needs, wired against one database and one photo store.
pub struct AppState {
    pub db: ChecklistDb,
    pub templates: TemplateUseCase,
    pub inspections: InspectionUseCase,
    pub queries: InspectionQueryUseCase,
}

impl AppState {
    pub fn new(
        db: ChecklistDb,
        photo_store: Arc<dyn PhotoStore>,
        settings: &Settings,
    ) -> Self {
        let repository: Arc<dyn ChecklistRepository> =
            Arc::new(SqliteChecklistRepository::new(&db));

        Self {
            templates: TemplateUseCase::new(repository.clone()),
            inspections: InspectionUseCase::new(
                repository.clone(),
                photo_store.clone(),
                settings.photo_namespace.clone(),
                settings.strict_completion,
            ),
            queries: InspectionQueryUseCase::new(
                repository,
                photo_store,
                settings.photo_namespace.clone(),
            ),
            db,
        }
    }
}

/// Opens (and migrates) the database and the filesystem photo store described by
/// `settings`.
pub async fn setup(settings: &Settings) -> Result<AppState> {
    let db = ChecklistDb::connect(&settings.database_url, &settings.pool_settings())
        .await
        .map_err(|err| {
            error!(error = %err, database_url = %settings.database_url, "Failed to open checklist DB");
            err
        })?;

    let photo_store =
        FileSystemPhotoStore::new(&settings.photo_root, &settings.photo_public_base_url)?;

    info!(
        database_url = %settings.database_url,
        photo_root = %settings.photo_root.display(),
        strict_completion = settings.strict_completion,
        "Checklist engine ready"
    );

    Ok(AppState::new(db, Arc::new(photo_store), settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::seed::seed_default_templates;
    use crate::domain::checklist::Role;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_setup_wires_file_backed_state() {
        let dir = std::env::temp_dir().join(format!("checklist-bootstrap-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let settings = Settings {
            database_url: format!("sqlite://{}", dir.join("checklist.db").display()),
            photo_root: dir.join("uploads"),
            ..Settings::default()
        };

        let state = setup(&settings).await.unwrap();
        let seeded = seed_default_templates(&state.templates).await.unwrap();
        assert_eq!(seeded.len(), 4);

        let started = state
            .inspections
            .start_inspection(Role::Ads, "SN-42".to_string(), "Inspector".to_string())
            .await
            .unwrap();
        state
            .inspections
            .save_answer(
                &started.inspection.id,
                &started.questions[0].id,
                "mounted".to_string(),
                &[vec![0xFF, 0xD8, 0xFF, 0xD9]],
            )
            .await
            .unwrap();

        let detail = state
            .queries
            .get_inspection_detail(&started.inspection.id)
            .await
            .unwrap();
        let photo = &detail.answers[0].answer.as_ref().unwrap().photos[0];
        assert!(dir.join("uploads/checklist-photos").join(&photo.key).exists());
        assert_eq!(
            photo.url.as_deref(),
            Some(format!("http://localhost:8080/uploads/checklist-photos/{}", photo.key).as_str())
        );

        state.db.pool().close().await;
        std::fs::remove_dir_all(&dir).ok();
    }
}
