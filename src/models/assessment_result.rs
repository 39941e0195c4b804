// src/models/assessment_result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::engine::{answers::AnswerSet, eligibility::Eligibility};

/// Represents the 'assessment_results' table: one row per attempt.
/// The row is created open (`completed = false`) when the attempt starts and
/// finalized once with the score.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub id: i64,
    pub assessment_id: i64,
    pub user_id: i64,
    pub attempt_number: i32,
    /// 0..=10, two decimals.
    pub score: Option<f64>,
    pub total_points: Option<i32>,
    pub earned_points: Option<f64>,
    pub correct_answers: Option<i32>,
    pub completed: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The values written when an open attempt is finalized.
/// Keyed by `(assessment_id, user_id, attempt_number)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub assessment_id: i64,
    pub user_id: i64,
    pub attempt_number: i32,
    pub score: f64,
    pub total_points: i32,
    pub earned_points: f64,
    pub correct_answers: i32,
}

/// Represents the 'category_scores' table: latest score per (user, category).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CategoryScore {
    pub user_id: i64,
    pub category_id: i64,
    pub score: f64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAssessmentRequest {
    /// Key: question id. Value: the submitted answer.
    pub answers: AnswerSet,
}

/// DTO returned when an attempt is started or resumed.
#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt: AssessmentResult,
    pub resumed: bool,
}

/// DTO returned after a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub attempt_number: i32,
    pub score: f64,
    pub total_points: i32,
    pub earned_points: f64,
    pub correct_answers: i32,
    pub total_questions: usize,
    /// Share of questions counted correct, rounded to a whole percent.
    pub percentage: u32,
    pub eligibility: Eligibility,
}
