// src/engine/scoring.rs

//! Turns an answer set into a score.
//!
//! Multiple-choice questions earn their full weight on an exact string match.
//! Open-ended questions are credited by answer length alone: a linear fraction
//! up to `OPEN_ENDED_FULL_CREDIT_CHARS` characters, with no content check.
//! The open-ended rule is a placeholder grading policy pending product review.

use serde::Serialize;
use thiserror::Error;

use crate::{
    config::{OPEN_ENDED_CORRECT_FRACTION, OPEN_ENDED_FULL_CREDIT_CHARS, SCORE_SCALE},
    engine::answers::AnswerSet,
    models::question::{Question, QuestionType},
};

/// Assessment definitions that cannot be scored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("assessment has no questions to score")]
    EmptyAssessment,

    #[error("question {question_id} has non-positive weight {points}")]
    InvalidPoints { question_id: i64, points: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSummary {
    /// 0..=10, rounded to two decimals.
    pub score: f64,
    pub total_points: i32,
    pub earned_points: f64,
    pub correct_answers: i32,
}

/// Scores `answers` against `questions`.
///
/// Unanswered questions count as the empty string. Answers to ids that are not
/// in `questions` are ignored.
pub fn score(questions: &[Question], answers: &AnswerSet) -> Result<ScoreSummary, ScoringError> {
    if questions.is_empty() {
        return Err(ScoringError::EmptyAssessment);
    }

    let mut total_points = 0;
    for q in questions {
        if q.points <= 0 {
            return Err(ScoringError::InvalidPoints {
                question_id: q.id,
                points: q.points,
            });
        }
        total_points += q.points;
    }

    let mut earned_points = 0.0;
    let mut correct_answers = 0;

    for q in questions {
        let answer = answers.answer_for(q.id);
        match q.question_type {
            QuestionType::MultipleChoice => {
                if answer == q.correct_answer {
                    earned_points += f64::from(q.points);
                    correct_answers += 1;
                }
            }
            QuestionType::OpenEnded => {
                let fraction = open_ended_fraction(answer);
                earned_points += fraction * f64::from(q.points);
                if fraction > OPEN_ENDED_CORRECT_FRACTION {
                    correct_answers += 1;
                }
            }
        }
    }

    let score = round_to_hundredths(earned_points / f64::from(total_points) * SCORE_SCALE);

    Ok(ScoreSummary {
        score: score.clamp(0.0, SCORE_SCALE),
        total_points,
        earned_points,
        correct_answers,
    })
}

/// Credit fraction for a free-text answer: `min(chars / 100, 1)`.
pub fn open_ended_fraction(answer: &str) -> f64 {
    let len = answer.chars().count().min(OPEN_ENDED_FULL_CREDIT_CHARS);
    len as f64 / OPEN_ENDED_FULL_CREDIT_CHARS as f64
}

/// Whole-number percentage of correct answers, as shown on quiz summaries.
pub fn percentage(correct: i32, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(correct.max(0)) / total as f64 * 100.0).round() as u32
}

pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
