// src/engine/eligibility.rs

use serde::Serialize;

use crate::models::assessment_result::AssessmentResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Where a user stands on one assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Eligibility {
    pub status: AttemptStatus,
    /// Score of the most recent completed attempt.
    pub latest_score: Option<f64>,
    pub can_retake: bool,
    pub attempts_used: i32,
    pub attempts_remaining: i32,
}

/// Derives the eligibility of a user from their attempt history.
///
/// `results` may be in any order; the most recent attempt is the one with the
/// highest `attempt_number`. Once `max_attempts` attempts are completed the
/// assessment is closed for good.
pub fn evaluate(max_attempts: i32, results: &[AssessmentResult]) -> Eligibility {
    let completed_count = results.iter().filter(|r| r.completed).count() as i32;
    let attempts_remaining = (max_attempts - completed_count).max(0);

    let Some(latest) = results.iter().max_by_key(|r| r.attempt_number) else {
        return Eligibility {
            status: AttemptStatus::NotStarted,
            latest_score: None,
            can_retake: true,
            attempts_used: 0,
            attempts_remaining,
        };
    };

    let latest_score = results
        .iter()
        .filter(|r| r.completed)
        .max_by_key(|r| r.attempt_number)
        .and_then(|r| r.score);

    if completed_count >= max_attempts {
        return Eligibility {
            status: AttemptStatus::Completed,
            latest_score,
            can_retake: false,
            attempts_used: completed_count,
            attempts_remaining,
        };
    }

    if !latest.completed {
        return Eligibility {
            status: AttemptStatus::InProgress,
            latest_score,
            can_retake: false,
            attempts_used: completed_count,
            attempts_remaining,
        };
    }

    Eligibility {
        status: AttemptStatus::Completed,
        latest_score,
        can_retake: true,
        attempts_used: completed_count,
        attempts_remaining,
    }
}
