use checklist_engine::application::use_cases::seed::seed_default_templates;
use checklist_engine::domain::inspection::InspectionFilter;
use checklist_engine::infrastructure::config::Settings;
use checklist_engine::infrastructure::{bootstrap, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(error = %err, "checklist-engine failed");
        eprintln!("checklist-engine: {err}");
        std::process::exit(1);
    }
}

async fn run() -> checklist_engine::domain::error::Result<()> {
    let settings = Settings::load()?;
    logging::init(&settings.log_filter);

    let state = bootstrap::setup(&settings).await?;
    let seeded = seed_default_templates(&state.templates).await?;
    if !seeded.is_empty() {
        let roles: Vec<&str> = seeded.iter().map(|role| role.as_str()).collect();
        info!(roles = %roles.join(","), "Seeded default templates");
    }

    for template in state.templates.list_templates().await? {
        info!(
            role = %template.role,
            version = template.version,
            active = template.is_active,
            "Checklist template"
        );
    }

    let inspections = state
        .queries
        .list_inspections(&InspectionFilter::default())
        .await?;
    let completed = inspections.iter().filter(|i| i.is_completed()).count();
    info!(
        total = inspections.len(),
        completed,
        in_progress = inspections.len() - completed,
        "Inspection summary"
    );

    state.db.pool().close().await;
    Ok(())
}
