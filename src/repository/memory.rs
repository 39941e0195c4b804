// src/repository/memory.rs

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{
    assessment::{Assessment, Category, CreateAssessmentRequest, UpdateAssessmentRequest},
    assessment_result::{AssessmentResult, AttemptOutcome, CategoryScore},
    question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
};

use super::{AssessmentRepository, RepoError};

#[derive(Default)]
struct Tables {
    next_id: i64,
    categories: Vec<Category>,
    assessments: Vec<Assessment>,
    questions: Vec<Question>,
    results: Vec<AssessmentResult>,
    category_scores: HashMap<(i64, i64), CategoryScore>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_question_count(&self, assessment: &Assessment) -> Assessment {
        let mut a = assessment.clone();
        a.total_questions = self
            .questions
            .iter()
            .filter(|q| q.assessment_id == a.id)
            .count() as i64;
        a
    }

    fn open_attempt_index(&self, outcome: &AttemptOutcome) -> Result<usize, RepoError> {
        self.results
            .iter()
            .position(|r| {
                r.assessment_id == outcome.assessment_id
                    && r.user_id == outcome.user_id
                    && r.attempt_number == outcome.attempt_number
                    && !r.completed
            })
            .ok_or_else(|| RepoError::NotFound(format!("open attempt {}", outcome.attempt_number)))
    }

    fn complete(&mut self, index: usize, outcome: &AttemptOutcome) -> AssessmentResult {
        let result = &mut self.results[index];
        result.score = Some(outcome.score);
        result.total_points = Some(outcome.total_points);
        result.earned_points = Some(outcome.earned_points);
        result.correct_answers = Some(outcome.correct_answers);
        result.completed = true;
        result.completed_at = Some(Utc::now());
        result.clone()
    }

    fn upsert_score(&mut self, user_id: i64, category_id: i64, score: f64) -> CategoryScore {
        let row = CategoryScore {
            user_id,
            category_id,
            score,
            updated_at: Utc::now(),
        };
        self.category_scores.insert((user_id, category_id), row.clone());
        row
    }
}

/// A row store kept in process memory.
///
/// All writes go through one lock, so attempt numbering is atomic. Writes to
/// results or category scores can be made to fail on demand to exercise the
/// persistence error paths.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    fail_result_writes: AtomicBool,
    fail_category_writes: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, `complete_attempt` and `finalize_attempt` fail with a database error.
    pub fn fail_result_writes(&self, fail: bool) {
        self.fail_result_writes.store(fail, Ordering::SeqCst);
    }

    /// While set, `upsert_category_score` and `finalize_attempt` fail with a
    /// database error. A failed finalize leaves the attempt untouched.
    pub fn fail_category_writes(&self, fail: bool) {
        self.fail_category_writes.store(fail, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepoError> {
        self.tables
            .lock()
            .map_err(|_| RepoError::Database("in-memory store poisoned".to_string()))
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        let t = self.tables()?;
        let mut categories = t.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepoError> {
        let mut t = self.tables()?;
        if t.categories.iter().any(|c| c.name == name) {
            return Err(RepoError::Conflict(format!("category '{}' exists", name)));
        }
        let category = Category {
            id: t.next_id(),
            name: name.to_string(),
        };
        t.categories.push(category.clone());
        Ok(category)
    }

    async fn list_assessments(&self, category_id: Option<i64>) -> Result<Vec<Assessment>, RepoError> {
        let t = self.tables()?;
        Ok(t.assessments
            .iter()
            .filter(|a| category_id.is_none_or(|c| a.category_id == c))
            .map(|a| t.with_question_count(a))
            .collect())
    }

    async fn get_assessment(&self, id: i64) -> Result<Option<Assessment>, RepoError> {
        let t = self.tables()?;
        Ok(t.assessments
            .iter()
            .find(|a| a.id == id)
            .map(|a| t.with_question_count(a)))
    }

    async fn create_assessment(&self, new: &CreateAssessmentRequest) -> Result<Assessment, RepoError> {
        let mut t = self.tables()?;
        if !t.categories.iter().any(|c| c.id == new.category_id) {
            return Err(RepoError::NotFound(format!("category {}", new.category_id)));
        }
        let assessment = Assessment {
            id: t.next_id(),
            category_id: new.category_id,
            title: new.title.clone(),
            description: new.description.clone(),
            duration: new.duration.clone(),
            total_questions: 0,
            max_attempts: new.max_attempts,
            created_at: Some(Utc::now()),
        };
        t.assessments.push(assessment.clone());
        Ok(assessment)
    }

    async fn update_assessment(
        &self,
        id: i64,
        changes: UpdateAssessmentRequest,
    ) -> Result<Assessment, RepoError> {
        let mut t = self.tables()?;
        if let Some(category_id) = changes.category_id {
            if !t.categories.iter().any(|c| c.id == category_id) {
                return Err(RepoError::NotFound(format!("category {}", category_id)));
            }
        }
        let assessment = t
            .assessments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| RepoError::NotFound(format!("assessment {}", id)))?;
        changes.apply(assessment);
        let updated = assessment.clone();
        Ok(t.with_question_count(&updated))
    }

    async fn delete_assessment(&self, id: i64) -> Result<(), RepoError> {
        let mut t = self.tables()?;
        let before = t.assessments.len();
        t.assessments.retain(|a| a.id != id);
        if t.assessments.len() == before {
            return Err(RepoError::NotFound(format!("assessment {}", id)));
        }
        t.questions.retain(|q| q.assessment_id != id);
        t.results.retain(|r| r.assessment_id != id);
        Ok(())
    }

    async fn list_questions(&self, assessment_id: i64) -> Result<Vec<Question>, RepoError> {
        let t = self.tables()?;
        Ok(t.questions
            .iter()
            .filter(|q| q.assessment_id == assessment_id)
            .cloned()
            .collect())
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>, RepoError> {
        let t = self.tables()?;
        Ok(t.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn create_question(
        &self,
        assessment_id: i64,
        new: &CreateQuestionRequest,
    ) -> Result<Question, RepoError> {
        let mut t = self.tables()?;
        if !t.assessments.iter().any(|a| a.id == assessment_id) {
            return Err(RepoError::NotFound(format!("assessment {}", assessment_id)));
        }
        let question = Question {
            id: t.next_id(),
            assessment_id,
            text: new.text.clone(),
            question_type: new.question_type,
            correct_answer: new.correct_answer.clone(),
            points: new.points,
            difficulty: new.difficulty.clone(),
            options: new.options.clone(),
            created_at: Some(Utc::now()),
        };
        t.questions.push(question.clone());
        Ok(question)
    }

    async fn update_question(
        &self,
        id: i64,
        changes: UpdateQuestionRequest,
    ) -> Result<Question, RepoError> {
        let mut t = self.tables()?;
        let question = t
            .questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| RepoError::NotFound(format!("question {}", id)))?;
        changes.apply(question);
        Ok(question.clone())
    }

    async fn delete_question(&self, id: i64) -> Result<(), RepoError> {
        let mut t = self.tables()?;
        let before = t.questions.len();
        t.questions.retain(|q| q.id != id);
        if t.questions.len() == before {
            return Err(RepoError::NotFound(format!("question {}", id)));
        }
        Ok(())
    }

    async fn list_results(
        &self,
        user_id: i64,
        assessment_id: i64,
    ) -> Result<Vec<AssessmentResult>, RepoError> {
        let t = self.tables()?;
        let mut results: Vec<AssessmentResult> = t
            .results
            .iter()
            .filter(|r| r.user_id == user_id && r.assessment_id == assessment_id)
            .cloned()
            .collect();
        results.sort_by_key(|r| r.attempt_number);
        Ok(results)
    }

    async fn start_attempt(
        &self,
        user_id: i64,
        assessment_id: i64,
        max_attempts: i32,
    ) -> Result<AssessmentResult, RepoError> {
        let mut t = self.tables()?;
        if !t.assessments.iter().any(|a| a.id == assessment_id) {
            return Err(RepoError::NotFound(format!("assessment {}", assessment_id)));
        }

        let history = t
            .results
            .iter()
            .filter(|r| r.user_id == user_id && r.assessment_id == assessment_id);

        let mut last_number = 0;
        let mut recorded = 0;
        for r in history {
            recorded += 1;
            if !r.completed {
                return Err(RepoError::Conflict(
                    "an attempt is already in progress".to_string(),
                ));
            }
            last_number = last_number.max(r.attempt_number);
        }
        if recorded >= max_attempts {
            return Err(RepoError::Conflict("no attempts remaining".to_string()));
        }

        let result = AssessmentResult {
            id: t.next_id(),
            assessment_id,
            user_id,
            attempt_number: last_number + 1,
            score: None,
            total_points: None,
            earned_points: None,
            correct_answers: None,
            completed: false,
            started_at: Utc::now(),
            completed_at: None,
        };
        t.results.push(result.clone());
        Ok(result)
    }

    async fn complete_attempt(&self, outcome: &AttemptOutcome) -> Result<AssessmentResult, RepoError> {
        if self.fail_result_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Database("result write rejected".to_string()));
        }

        let mut t = self.tables()?;
        let index = t.open_attempt_index(outcome)?;
        Ok(t.complete(index, outcome))
    }

    async fn finalize_attempt(
        &self,
        outcome: &AttemptOutcome,
        category_id: i64,
    ) -> Result<AssessmentResult, RepoError> {
        if self.fail_result_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Database("result write rejected".to_string()));
        }

        let mut t = self.tables()?;
        let index = t.open_attempt_index(outcome)?;
        if self.fail_category_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Database("category score write rejected".to_string()));
        }

        let result = t.complete(index, outcome);
        t.upsert_score(outcome.user_id, category_id, outcome.score);
        Ok(result)
    }

    async fn abandon_open_attempt(&self, user_id: i64, assessment_id: i64) -> Result<(), RepoError> {
        let mut t = self.tables()?;
        let before = t.results.len();
        t.results
            .retain(|r| !(r.user_id == user_id && r.assessment_id == assessment_id && !r.completed));
        if t.results.len() == before {
            return Err(RepoError::NotFound("open attempt".to_string()));
        }
        Ok(())
    }

    async fn upsert_category_score(
        &self,
        user_id: i64,
        category_id: i64,
        score: f64,
    ) -> Result<CategoryScore, RepoError> {
        if self.fail_category_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Database("category score write rejected".to_string()));
        }

        let mut t = self.tables()?;
        Ok(t.upsert_score(user_id, category_id, score))
    }

    async fn list_category_scores(&self, user_id: i64) -> Result<Vec<CategoryScore>, RepoError> {
        let t = self.tables()?;
        let mut rows: Vec<CategoryScore> = t
            .category_scores
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.category_id);
        Ok(rows)
    }
}
