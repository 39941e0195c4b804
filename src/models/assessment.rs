// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    config::DEFAULT_MAX_ATTEMPTS,
    engine::eligibility::Eligibility,
    models::question::PublicQuestion,
};

/// Represents the 'categories' table. Groups assessments by subject area.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Represents the 'assessments' table in the database.
/// `total_questions` is counted from the owned questions when read.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Assessment {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub total_questions: i64,
    pub max_attempts: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Assessment {
    /// The attempt cap to enforce. A stored cap below one falls back to `fallback`.
    pub fn effective_max_attempts(&self, fallback: i32) -> i32 {
        if self.max_attempts >= 1 {
            self.max_attempts
        } else {
            fallback
        }
    }
}

/// DTO for an assessment as seen by a student: questions without answer keys.
#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub questions: Vec<PublicQuestion>,
}

/// Listing row: an assessment with the caller's eligibility for it.
#[derive(Debug, Serialize)]
pub struct AssessmentSummary {
    #[serde(flatten)]
    pub assessment: Assessment,
    #[serde(flatten)]
    pub eligibility: Eligibility,
}

#[derive(Debug, Deserialize)]
pub struct AssessmentListParams {
    pub category_id: Option<i64>,
}

/// DTO for creating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// DTO for creating an assessment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    pub category_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub duration: Option<String>,
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
}

fn default_max_attempts() -> i32 {
    DEFAULT_MAX_ATTEMPTS
}

/// DTO for updating an assessment. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAssessmentRequest {
    pub category_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub duration: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: Option<i32>,
}

impl UpdateAssessmentRequest {
    /// Applies the present fields on top of `assessment`.
    pub fn apply(self, assessment: &mut Assessment) {
        if let Some(category_id) = self.category_id {
            assessment.category_id = category_id;
        }
        if let Some(title) = self.title {
            assessment.title = title;
        }
        if let Some(description) = self.description {
            assessment.description = Some(description);
        }
        if let Some(duration) = self.duration {
            assessment.duration = Some(duration);
        }
        if let Some(max_attempts) = self.max_attempts {
            assessment.max_attempts = max_attempts;
        }
    }
}
