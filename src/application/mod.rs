pub mod use_cases;

pub use use_cases::inspection::{InspectionUseCase, StartedInspection, StepOutcome};
pub use use_cases::inspection_query::InspectionQueryUseCase;
pub use use_cases::template::TemplateUseCase;
