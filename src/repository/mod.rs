// src/repository/mod.rs

//! The row store behind the assessment engine.
//!
//! Handlers and services only see `dyn AssessmentRepository`; the Postgres
//! implementation is used in production and the in-memory one in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    assessment::{
        Assessment, Category, CreateAssessmentRequest, UpdateAssessmentRequest,
    },
    assessment_result::{AssessmentResult, AttemptOutcome, CategoryScore},
    question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound("row".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                RepoError::NotFound(db.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, RepoError>;

    async fn create_category(&self, name: &str) -> Result<Category, RepoError>;

    async fn list_assessments(&self, category_id: Option<i64>) -> Result<Vec<Assessment>, RepoError>;

    async fn get_assessment(&self, id: i64) -> Result<Option<Assessment>, RepoError>;

    async fn create_assessment(&self, new: &CreateAssessmentRequest) -> Result<Assessment, RepoError>;

    async fn update_assessment(
        &self,
        id: i64,
        changes: UpdateAssessmentRequest,
    ) -> Result<Assessment, RepoError>;

    /// Removes the assessment with its questions and results.
    async fn delete_assessment(&self, id: i64) -> Result<(), RepoError>;

    async fn list_questions(&self, assessment_id: i64) -> Result<Vec<Question>, RepoError>;

    async fn get_question(&self, id: i64) -> Result<Option<Question>, RepoError>;

    async fn create_question(
        &self,
        assessment_id: i64,
        new: &CreateQuestionRequest,
    ) -> Result<Question, RepoError>;

    async fn update_question(
        &self,
        id: i64,
        changes: UpdateQuestionRequest,
    ) -> Result<Question, RepoError>;

    async fn delete_question(&self, id: i64) -> Result<(), RepoError>;

    /// All attempts of a user on an assessment, ascending by attempt number.
    async fn list_results(
        &self,
        user_id: i64,
        assessment_id: i64,
    ) -> Result<Vec<AssessmentResult>, RepoError>;

    /// Opens a new attempt. The attempt number is assigned by the store at
    /// write time, never from a count the caller read earlier. Fails with
    /// `Conflict` if the user already has an open attempt, or already has
    /// `max_attempts` attempts on record when the row would be written.
    async fn start_attempt(
        &self,
        user_id: i64,
        assessment_id: i64,
        max_attempts: i32,
    ) -> Result<AssessmentResult, RepoError>;

    /// Finalizes the open attempt identified by
    /// `(assessment_id, user_id, attempt_number)`. Fails with `NotFound` when
    /// that attempt does not exist or is already completed.
    async fn complete_attempt(&self, outcome: &AttemptOutcome) -> Result<AssessmentResult, RepoError>;

    /// `complete_attempt` and `upsert_category_score` as one unit: either both
    /// writes land or neither does, and the attempt stays open.
    async fn finalize_attempt(
        &self,
        outcome: &AttemptOutcome,
        category_id: i64,
    ) -> Result<AssessmentResult, RepoError>;

    /// Deletes the user's open attempt on the assessment.
    async fn abandon_open_attempt(&self, user_id: i64, assessment_id: i64) -> Result<(), RepoError>;

    /// Last write wins.
    async fn upsert_category_score(
        &self,
        user_id: i64,
        category_id: i64,
        score: f64,
    ) -> Result<CategoryScore, RepoError>;

    async fn list_category_scores(&self, user_id: i64) -> Result<Vec<CategoryScore>, RepoError>;
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::*;
    use crate::error::AppError;

    #[test]
    fn sqlx_errors_reach_http_through_repo_error() {
        let missing = RepoError::from(sqlx::Error::RowNotFound);
        assert!(matches!(missing, RepoError::NotFound(_)));
        assert_eq!(AppError::from(missing).into_response().status(), StatusCode::NOT_FOUND);

        let closed = RepoError::from(sqlx::Error::PoolClosed);
        assert!(matches!(closed, RepoError::Database(_)));
        assert_eq!(
            AppError::from(closed).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
