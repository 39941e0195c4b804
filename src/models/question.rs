// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How a question is answered and therefore how it is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Exact match against `correct_answer`.
    MultipleChoice,
    /// Free text, credited by length.
    OpenEnded,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::OpenEnded => "open_ended",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "open_ended" => Ok(QuestionType::OpenEnded),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub assessment_id: i64,

    /// The text shown to the student.
    pub text: String,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// For multiple choice, the exact option string that earns the points.
    /// Unused for open-ended questions.
    pub correct_answer: String,

    /// Weight of this question. Always positive.
    pub points: i32,

    pub difficulty: Option<String>,

    /// Choices offered for multiple choice. Empty for open-ended.
    pub options: Vec<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    /// Same rules as on create, for a question after a partial update.
    pub fn check_consistency(&self) -> Result<(), String> {
        check_answer_key(self.question_type, &self.correct_answer, &self.options)
    }
}

/// A multiple-choice question must offer options and its answer key must be one of them.
fn check_answer_key(
    question_type: QuestionType,
    correct_answer: &str,
    options: &[String],
) -> Result<(), String> {
    if question_type == QuestionType::MultipleChoice {
        if options.is_empty() {
            return Err("Multiple choice questions need options".to_string());
        }
        if !options.iter().any(|o| o == correct_answer) {
            return Err("correct_answer must be one of the options".to_string());
        }
    }
    Ok(())
}

/// DTO for sending a question to a student (no answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: i32,
    pub difficulty: Option<String>,
    pub options: Vec<String>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            text: q.text,
            question_type: q.question_type,
            points: q.points,
            difficulty: q.difficulty,
            options: q.options,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub correct_answer: String,
    #[validate(range(min = 1, max = 1000))]
    pub points: i32,
    #[validate(length(max = 50))]
    pub difficulty: Option<String>,
    #[validate(custom(function = validate_options))]
    #[serde(default)]
    pub options: Vec<String>,
}

impl CreateQuestionRequest {
    /// Cross-field rules the derive cannot express.
    pub fn check_consistency(&self) -> Result<(), String> {
        check_answer_key(self.question_type, &self.correct_answer, &self.options)
    }
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    #[validate(length(max = 500))]
    pub correct_answer: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub points: Option<i32>,
    #[validate(length(max = 50))]
    pub difficulty: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
}

impl UpdateQuestionRequest {
    /// Applies the present fields on top of `question`.
    pub fn apply(self, question: &mut Question) {
        if let Some(text) = self.text {
            question.text = text;
        }
        if let Some(question_type) = self.question_type {
            question.question_type = question_type;
        }
        if let Some(correct_answer) = self.correct_answer {
            question.correct_answer = correct_answer;
        }
        if let Some(points) = self.points {
            question.points = points;
        }
        if let Some(difficulty) = self.difficulty {
            question.difficulty = Some(difficulty);
        }
        if let Some(options) = self.options {
            question.options = options;
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() > 20 {
        return Err(validator::ValidationError::new("too_many_options"));
    }
    for opt in options {
        if opt.is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
