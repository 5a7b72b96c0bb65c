use crate::application::use_cases::inspection::InspectionUseCase;
use crate::application::use_cases::inspection_query::InspectionQueryUseCase;
use crate::application::use_cases::template::TemplateUseCase;
use crate::domain::checklist::QuestionInput;
use crate::infrastructure::db::checklist_repository::SqliteChecklistRepository;
use crate::infrastructure::db::connection::{ChecklistDb, PoolSettings};
use crate::infrastructure::photo_store::memory::MemoryPhotoStore;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) const NAMESPACE: &str = "checklist-photos";

pub(crate) struct Fixture {
    pub photos: Arc<MemoryPhotoStore>,
    pub templates: TemplateUseCase,
    pub inspections: InspectionUseCase,
    pub queries: InspectionQueryUseCase,
}

pub(crate) async fn fixture() -> Fixture {
    fixture_with(false).await
}

pub(crate) async fn fixture_with(strict_completion: bool) -> Fixture {
    let db = ChecklistDb::in_memory().await.unwrap();
    build(&db, strict_completion)
}

/// Fixture over a pooled SQLite file in a fresh temp dir, for tests that need
/// more than one connection. The caller removes the returned dir.
pub(crate) async fn file_fixture(strict_completion: bool) -> (Fixture, PathBuf) {
    let dir = std::env::temp_dir().join(format!("checklist-fixture-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let url = format!("sqlite://{}", dir.join("checklist.db").display());
    let db = ChecklistDb::connect(&url, &PoolSettings::default()).await.unwrap();
    (build(&db, strict_completion), dir)
}

fn build(db: &ChecklistDb, strict_completion: bool) -> Fixture {
    let repository = Arc::new(SqliteChecklistRepository::new(db));
    let photos = Arc::new(MemoryPhotoStore::default());

    Fixture {
        templates: TemplateUseCase::new(repository.clone()),
        inspections: InspectionUseCase::new(
            repository.clone(),
            photos.clone(),
            NAMESPACE.to_string(),
            strict_completion,
        ),
        queries: InspectionQueryUseCase::new(repository, photos.clone(), NAMESPACE.to_string()),
        photos,
    }
}

/// `count` required questions ordered 1..=count, each taking one or two photos.
pub(crate) fn question_inputs(count: i64) -> Vec<QuestionInput> {
    (1..=count)
        .map(|order| QuestionInput {
            text: format!("Check item {order}"),
            order,
            min_photos: 1,
            max_photos: 2,
            is_required: true,
            reference_images: Vec::new(),
        })
        .collect()
}

pub(crate) fn jpeg(tag: u8) -> Vec<u8> {
    vec![0xFF, 0xD8, tag, 0xFF, 0xD9]
}
