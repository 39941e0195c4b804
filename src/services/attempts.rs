// src/services/attempts.rs

use std::sync::Arc;

use crate::{
    engine::{self, AnswerSet, AttemptStatus, Eligibility, scoring},
    error::AppError,
    models::{
        assessment::Assessment,
        assessment_result::{AssessmentResult, AttemptOutcome, StartAttemptResponse, SubmissionResponse},
    },
    repository::AssessmentRepository,
};

/// Runs attempts against the row store: eligibility, start, submit.
#[derive(Clone)]
pub struct AttemptService {
    repo: Arc<dyn AssessmentRepository>,
    default_max_attempts: i32,
}

impl AttemptService {
    pub fn new(repo: Arc<dyn AssessmentRepository>, default_max_attempts: i32) -> Self {
        Self {
            repo,
            default_max_attempts,
        }
    }

    async fn load_assessment(&self, assessment_id: i64) -> Result<Assessment, AppError> {
        self.repo
            .get_assessment(assessment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))
    }

    /// Eligibility of `user_id` for an already loaded assessment.
    pub async fn eligibility_for(
        &self,
        user_id: i64,
        assessment: &Assessment,
    ) -> Result<Eligibility, AppError> {
        let results = self.repo.list_results(user_id, assessment.id).await?;
        Ok(engine::evaluate(
            assessment.effective_max_attempts(self.default_max_attempts),
            &results,
        ))
    }

    pub async fn status(&self, user_id: i64, assessment_id: i64) -> Result<Eligibility, AppError> {
        let assessment = self.load_assessment(assessment_id).await?;
        self.eligibility_for(user_id, &assessment).await
    }

    pub async fn history(
        &self,
        user_id: i64,
        assessment_id: i64,
    ) -> Result<Vec<AssessmentResult>, AppError> {
        self.load_assessment(assessment_id).await?;
        Ok(self.repo.list_results(user_id, assessment_id).await?)
    }

    /// Opens a new attempt, or hands back the one already open.
    pub async fn start(&self, user_id: i64, assessment_id: i64) -> Result<StartAttemptResponse, AppError> {
        let assessment = self.load_assessment(assessment_id).await?;
        let max_attempts = assessment.effective_max_attempts(self.default_max_attempts);
        let results = self.repo.list_results(user_id, assessment_id).await?;
        let eligibility = engine::evaluate(max_attempts, &results);

        if eligibility.status == AttemptStatus::InProgress {
            if let Some(open) = results.into_iter().rev().find(|r| !r.completed) {
                return Ok(StartAttemptResponse {
                    attempt: open,
                    resumed: true,
                });
            }
        }

        if !eligibility.can_retake {
            return Err(AppError::Conflict(
                "No attempts remaining for this assessment".to_string(),
            ));
        }

        // The store re-checks the cap when it writes the row.
        let attempt = self
            .repo
            .start_attempt(user_id, assessment_id, max_attempts)
            .await?;
        tracing::info!(
            "User {} started attempt {} on assessment {}",
            user_id,
            attempt.attempt_number,
            assessment_id
        );

        Ok(StartAttemptResponse {
            attempt,
            resumed: false,
        })
    }

    /// Scores `answers`, finalizes the open attempt and records the category score.
    ///
    /// * Configuration errors are raised before anything is written.
    /// * When no attempt is open, one is started first (subject to the cap).
    /// * The result and the category score are written together; if either
    ///   fails the attempt stays open and can be resubmitted.
    pub async fn submit(
        &self,
        user_id: i64,
        assessment_id: i64,
        answers: &AnswerSet,
    ) -> Result<SubmissionResponse, AppError> {
        let assessment = self.load_assessment(assessment_id).await?;
        let questions = self.repo.list_questions(assessment_id).await?;
        let summary = scoring::score(&questions, answers)?;

        let attempt = self.start(user_id, assessment_id).await?.attempt;

        let outcome = AttemptOutcome {
            assessment_id,
            user_id,
            attempt_number: attempt.attempt_number,
            score: summary.score,
            total_points: summary.total_points,
            earned_points: summary.earned_points,
            correct_answers: summary.correct_answers,
        };

        self.repo
            .finalize_attempt(&outcome, assessment.category_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to record attempt {} for user {} on assessment {}: {}",
                    attempt.attempt_number,
                    user_id,
                    assessment_id,
                    e
                );
                AppError::from(e)
            })?;

        let eligibility = self.eligibility_for(user_id, &assessment).await?;

        tracing::info!(
            "User {} scored {} on assessment {} (attempt {})",
            user_id,
            summary.score,
            assessment_id,
            attempt.attempt_number
        );

        Ok(SubmissionResponse {
            attempt_number: attempt.attempt_number,
            score: summary.score,
            total_points: summary.total_points,
            earned_points: summary.earned_points,
            correct_answers: summary.correct_answers,
            total_questions: questions.len(),
            percentage: scoring::percentage(summary.correct_answers, questions.len()),
            eligibility,
        })
    }
}
