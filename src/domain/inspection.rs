use crate::domain::checklist::{Question, Role};
use crate::domain::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    InProgress,
    Completed,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionStatus::InProgress => "in_progress",
            InspectionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InspectionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "in_progress" => Ok(InspectionStatus::InProgress),
            "completed" => Ok(InspectionStatus::Completed),
            other => Err(AppError::ValidationError(format!(
                "Unknown inspection status: {}",
                other
            ))),
        }
    }
}

/// One inspector's run through a template for one machine.
///
/// `finished_at` is set exactly when `status` is `Completed`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: String,
    pub template_id: String,
    pub machine_serial: String,
    pub inspector_name: String,
    pub status: InspectionStatus,
    pub started_at: i64,
    pub finished_at: Option<i64>,
}

impl Inspection {
    pub fn is_completed(&self) -> bool {
        self.status == InspectionStatus::Completed
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InspectionAnswer {
    pub id: String,
    pub inspection_id: String,
    pub question_id: String,
    pub comment: String,
    /// Photo store keys, in upload order.
    pub photos: Vec<String>,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InspectionFilter {
    pub role: Option<Role>,
    pub status: Option<InspectionStatus>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoView {
    pub key: String,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub id: String,
    pub comment: String,
    pub photos: Vec<PhotoView>,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InspectionAnswerDetail {
    pub question: Question,
    pub answer: Option<AnswerView>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InspectionDetail {
    pub inspection: Inspection,
    pub role: Role,
    pub template_version: i64,
    /// One entry per template question, in question order.
    pub answers: Vec<InspectionAnswerDetail>,
}

/// Steps are 1-indexed positions into the ordered question list.
pub fn question_at_step(questions: &[Question], step: usize) -> Option<&Question> {
    step.checked_sub(1).and_then(|index| questions.get(index))
}

pub fn is_final_step(step: usize, total: usize) -> bool {
    total > 0 && step >= total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(order: i64) -> Question {
        Question {
            id: format!("q{order}"),
            template_id: "t".to_string(),
            text: format!("Question {order}"),
            order,
            min_photos: 0,
            max_photos: 1,
            is_required: true,
            reference_images: Vec::new(),
            created_at: 0,
        }
    }

    #[test]
    fn test_question_at_step_is_one_indexed() {
        let questions = vec![question(1), question(2), question(3)];
        assert!(question_at_step(&questions, 0).is_none());
        assert_eq!(question_at_step(&questions, 1).unwrap().id, "q1");
        assert_eq!(question_at_step(&questions, 3).unwrap().id, "q3");
        assert!(question_at_step(&questions, 4).is_none());
    }

    #[test]
    fn test_is_final_step() {
        assert!(!is_final_step(1, 3));
        assert!(is_final_step(3, 3));
        assert!(!is_final_step(1, 0));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [InspectionStatus::InProgress, InspectionStatus::Completed] {
            assert_eq!(status.as_str().parse::<InspectionStatus>().unwrap(), status);
        }
        assert!("done".parse::<InspectionStatus>().is_err());
    }
}
