use crate::application::use_cases::template::TemplateUseCase;
use crate::domain::checklist::{QuestionInput, Role};
use crate::domain::error::{AppError, Result};
use tracing::info;

/// (text, min_photos, max_photos) per step, in order.
type SeedQuestion = (&'static str, i64, i64);

const OTK: &[SeedQuestion] = &[
    ("Check the housing for scratches", 1, 3),
    ("Check that the bill acceptor works", 1, 2),
    ("Check the kit contents (keys, passport)", 1, 1),
];

const STICKER: &[SeedQuestion] = &[
    ("Front panel wrap", 1, 2),
    ("Side panel wrap", 2, 4),
    ("No bubbles under the film", 1, 3),
];

const ADS: &[SeedQuestion] = &[
    ("Advertising lightbox installed", 1, 1),
    ("Backlight check", 1, 1),
];

const ASSEMBLER: &[SeedQuestion] = &[
    ("Payment system mounted", 1, 2),
    ("Ribbon cables connected", 2, 3),
    ("Modem configured", 1, 1),
];

pub fn default_questions(role: Role) -> Vec<QuestionInput> {
    let seed = match role {
        Role::Otk => OTK,
        Role::Sticker => STICKER,
        Role::Ads => ADS,
        Role::Assembler => ASSEMBLER,
    };

    seed.iter()
        .zip(1..)
        .map(|(&(text, min_photos, max_photos), order)| QuestionInput {
            text: text.to_string(),
            order,
            min_photos,
            max_photos,
            is_required: true,
            reference_images: Vec::new(),
        })
        .collect()
}

/// Publishes the default checklist for every role that has no active template yet.
/// Roles that already have one are left alone, so running it twice is a no-op.
pub async fn seed_default_templates(templates: &TemplateUseCase) -> Result<Vec<Role>> {
    let mut seeded = Vec::new();
    for role in Role::ALL {
        match templates.get_active_template(role).await {
            Ok(existing) => {
                info!(role = %role, version = existing.template.version, "Template exists, skipping seed");
                continue;
            }
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        templates
            .create_template(role, default_questions(role))
            .await?;
        seeded.push(role);
    }

    info!(seeded = seeded.len(), "Seeding finished");
    Ok(seeded)
}
