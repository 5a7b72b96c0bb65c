use crate::domain::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Operator category. Each role has its own template lineage.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Otk,
    Sticker,
    Ads,
    Assembler,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Otk, Role::Sticker, Role::Ads, Role::Assembler];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Otk => "OTK",
            Role::Sticker => "STICKER",
            Role::Ads => "ADS",
            Role::Assembler => "ASSEMBLER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| AppError::ValidationError(format!("Unknown role: {}", value)))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistTemplate {
    pub id: String,
    pub role: Role,
    pub version: i64,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub template_id: String,
    pub text: String,
    pub order: i64,
    pub min_photos: i64,
    pub max_photos: i64,
    pub is_required: bool,
    pub reference_images: Vec<String>,
    pub created_at: i64,
}

impl Question {
    pub fn accepts_photo_count(&self, count: usize) -> bool {
        let count = count as i64;
        count >= self.min_photos && count <= self.max_photos
    }
}

/// Administrator-supplied question definition, before identities are assigned.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_photo_bounds"))]
pub struct QuestionInput {
    #[validate(length(min = 1, message = "question text is required"))]
    pub text: String,
    #[validate(range(min = 1, message = "order must be at least 1"))]
    pub order: i64,
    #[validate(range(min = 0, message = "minPhotos must not be negative"))]
    pub min_photos: i64,
    #[validate(range(min = 0, message = "maxPhotos must not be negative"))]
    pub max_photos: i64,
    #[serde(default = "default_required")]
    pub is_required: bool,
    #[serde(default)]
    pub reference_images: Vec<String>,
}

fn default_required() -> bool {
    true
}

fn validate_photo_bounds(input: &QuestionInput) -> Result<(), ValidationError> {
    if input.min_photos > input.max_photos {
        let mut err = ValidationError::new("photo_bounds");
        err.message = Some(
            format!(
                "minPhotos ({}) exceeds maxPhotos ({})",
                input.min_photos, input.max_photos
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// A template about to be published; the version is assigned by the gateway.
#[derive(Debug, Clone)]
pub struct TemplateDraft {
    pub id: String,
    pub role: Role,
    pub created_at: i64,
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TemplateWithQuestions {
    pub template: ChecklistTemplate,
    pub questions: Vec<Question>,
}
