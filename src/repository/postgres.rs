// src/repository/postgres.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool, types::Json};

use crate::{
    config::ATTEMPT_NUMBER_RETRIES,
    models::{
        assessment::{Assessment, Category, CreateAssessmentRequest, UpdateAssessmentRequest},
        assessment_result::{AssessmentResult, AttemptOutcome, CategoryScore},
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
    },
    repository::{AssessmentRepository, RepoError},
};

const ONE_OPEN_ATTEMPT_INDEX: &str = "idx_results_one_open_attempt";

const ASSESSMENT_COLUMNS: &str = r#"
    a.id,
    a.category_id,
    a.title,
    a.description,
    a.duration,
    (SELECT COUNT(*) FROM questions q WHERE q.assessment_id = a.id) AS total_questions,
    a.max_attempts,
    a.created_at
"#;

const QUESTION_COLUMNS: &str =
    "id, assessment_id, text, type, correct_answer, points, difficulty, options, created_at";

const RESULT_COLUMNS: &str = "id, assessment_id, user_id, attempt_number, score, total_points, \
     earned_points, correct_answers, completed, started_at, completed_at";

/// Raw 'questions' row. The type column is TEXT and is parsed on the way out.
#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    assessment_id: i64,
    text: String,
    #[sqlx(rename = "type")]
    question_type: String,
    correct_answer: String,
    points: i32,
    difficulty: Option<String>,
    options: Json<Vec<String>>,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = RepoError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let question_type = row.question_type.parse().map_err(RepoError::Database)?;
        Ok(Question {
            id: row.id,
            assessment_id: row.assessment_id,
            text: row.text,
            question_type,
            correct_answer: row.correct_answer,
            points: row.points,
            difficulty: row.difficulty,
            options: row.options.0,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn complete_open_attempt(
    conn: &mut PgConnection,
    outcome: &AttemptOutcome,
) -> Result<AssessmentResult, RepoError> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        r#"
        UPDATE assessment_results
        SET score = $4,
            total_points = $5,
            earned_points = $6,
            correct_answers = $7,
            completed = TRUE,
            completed_at = CURRENT_TIMESTAMP
        WHERE assessment_id = $1 AND user_id = $2 AND attempt_number = $3 AND NOT completed
        RETURNING {}
        "#,
        RESULT_COLUMNS
    ))
    .bind(outcome.assessment_id)
    .bind(outcome.user_id)
    .bind(outcome.attempt_number)
    .bind(outcome.score)
    .bind(outcome.total_points)
    .bind(outcome.earned_points)
    .bind(outcome.correct_answers)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepoError::NotFound(format!("open attempt {}", outcome.attempt_number)))
}

async fn upsert_score(
    conn: &mut PgConnection,
    user_id: i64,
    category_id: i64,
    score: f64,
) -> Result<CategoryScore, RepoError> {
    let row = sqlx::query_as::<_, CategoryScore>(
        r#"
        INSERT INTO category_scores (user_id, category_id, score)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, category_id) DO UPDATE SET
            score = EXCLUDED.score,
            updated_at = CURRENT_TIMESTAMP
        RETURNING user_id, category_id, score, updated_at
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .bind(score)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

#[async_trait]
impl AssessmentRepository for PgRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepoError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn list_assessments(&self, category_id: Option<i64>) -> Result<Vec<Assessment>, RepoError> {
        let assessments = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {} FROM assessments a WHERE ($1::BIGINT IS NULL OR a.category_id = $1) ORDER BY a.id",
            ASSESSMENT_COLUMNS
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(assessments)
    }

    async fn get_assessment(&self, id: i64) -> Result<Option<Assessment>, RepoError> {
        let assessment = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {} FROM assessments a WHERE a.id = $1",
            ASSESSMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assessment)
    }

    async fn create_assessment(&self, new: &CreateAssessmentRequest) -> Result<Assessment, RepoError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO assessments (category_id, title, description, duration, max_attempts)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(new.category_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.duration)
        .bind(new.max_attempts)
        .fetch_one(&self.pool)
        .await?;

        self.get_assessment(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("assessment {}", id)))
    }

    async fn update_assessment(
        &self,
        id: i64,
        changes: UpdateAssessmentRequest,
    ) -> Result<Assessment, RepoError> {
        let mut assessment = self
            .get_assessment(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("assessment {}", id)))?;
        changes.apply(&mut assessment);

        sqlx::query(
            r#"
            UPDATE assessments
            SET category_id = $1, title = $2, description = $3, duration = $4, max_attempts = $5
            WHERE id = $6
            "#,
        )
        .bind(assessment.category_id)
        .bind(&assessment.title)
        .bind(&assessment.description)
        .bind(&assessment.duration)
        .bind(assessment.max_attempts)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(assessment)
    }

    async fn delete_assessment(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM assessments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("assessment {}", id)));
        }
        Ok(())
    }

    async fn list_questions(&self, assessment_id: i64) -> Result<Vec<Question>, RepoError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions WHERE assessment_id = $1 ORDER BY id",
            QUESTION_COLUMNS
        ))
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>, RepoError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions WHERE id = $1",
            QUESTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Question::try_from).transpose()
    }

    async fn create_question(
        &self,
        assessment_id: i64,
        new: &CreateQuestionRequest,
    ) -> Result<Question, RepoError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            r#"
            INSERT INTO questions (assessment_id, text, type, correct_answer, points, difficulty, options)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        ))
        .bind(assessment_id)
        .bind(&new.text)
        .bind(new.question_type.as_str())
        .bind(&new.correct_answer)
        .bind(new.points)
        .bind(&new.difficulty)
        .bind(Json(&new.options))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update_question(
        &self,
        id: i64,
        changes: UpdateQuestionRequest,
    ) -> Result<Question, RepoError> {
        let mut question = self
            .get_question(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("question {}", id)))?;
        changes.apply(&mut question);

        sqlx::query(
            r#"
            UPDATE questions
            SET text = $1, type = $2, correct_answer = $3, points = $4, difficulty = $5, options = $6
            WHERE id = $7
            "#,
        )
        .bind(&question.text)
        .bind(question.question_type.as_str())
        .bind(&question.correct_answer)
        .bind(question.points)
        .bind(&question.difficulty)
        .bind(Json(&question.options))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("question {}", id)));
        }
        Ok(())
    }

    async fn list_results(
        &self,
        user_id: i64,
        assessment_id: i64,
    ) -> Result<Vec<AssessmentResult>, RepoError> {
        let results = sqlx::query_as::<_, AssessmentResult>(&format!(
            r#"
            SELECT {}
            FROM assessment_results
            WHERE user_id = $1 AND assessment_id = $2
            ORDER BY attempt_number
            "#,
            RESULT_COLUMNS
        ))
        .bind(user_id)
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(results)
    }

    async fn start_attempt(
        &self,
        user_id: i64,
        assessment_id: i64,
        max_attempts: i32,
    ) -> Result<AssessmentResult, RepoError> {
        // The number and the cap are both evaluated inside the INSERT; the
        // unique constraint on (assessment_id, user_id, attempt_number)
        // rejects a concurrent twin, and the retry re-reads the count.
        let sql = format!(
            r#"
            INSERT INTO assessment_results (assessment_id, user_id, attempt_number)
            SELECT $1, $2, COALESCE(MAX(attempt_number), 0) + 1
            FROM assessment_results
            WHERE assessment_id = $1 AND user_id = $2
            HAVING COUNT(*) < $3::BIGINT
            RETURNING {}
            "#,
            RESULT_COLUMNS
        );

        let mut tries = 0;
        loop {
            let outcome = sqlx::query_as::<_, AssessmentResult>(&sql)
                .bind(assessment_id)
                .bind(user_id)
                .bind(i64::from(max_attempts))
                .fetch_optional(&self.pool)
                .await;

            match outcome {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => {
                    return Err(RepoError::Conflict("no attempts remaining".to_string()));
                }
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    if db.constraint() == Some(ONE_OPEN_ATTEMPT_INDEX) {
                        return Err(RepoError::Conflict(
                            "an attempt is already in progress".to_string(),
                        ));
                    }
                    tries += 1;
                    if tries > ATTEMPT_NUMBER_RETRIES {
                        return Err(RepoError::Conflict(
                            "could not assign an attempt number".to_string(),
                        ));
                    }
                    tracing::warn!(
                        "Attempt number race for user {} on assessment {}, retrying ({})",
                        user_id,
                        assessment_id,
                        tries
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn complete_attempt(&self, outcome: &AttemptOutcome) -> Result<AssessmentResult, RepoError> {
        let mut conn = self.pool.acquire().await?;
        complete_open_attempt(&mut conn, outcome).await
    }

    async fn finalize_attempt(
        &self,
        outcome: &AttemptOutcome,
        category_id: i64,
    ) -> Result<AssessmentResult, RepoError> {
        let mut tx = self.pool.begin().await?;

        let result = complete_open_attempt(&mut tx, outcome).await?;
        upsert_score(&mut tx, outcome.user_id, category_id, outcome.score).await?;

        tx.commit().await?;
        Ok(result)
    }

    async fn abandon_open_attempt(&self, user_id: i64, assessment_id: i64) -> Result<(), RepoError> {
        let result = sqlx::query(
            "DELETE FROM assessment_results WHERE user_id = $1 AND assessment_id = $2 AND NOT completed",
        )
        .bind(user_id)
        .bind(assessment_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
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
        let mut conn = self.pool.acquire().await?;
        upsert_score(&mut conn, user_id, category_id, score).await
    }

    async fn list_category_scores(&self, user_id: i64) -> Result<Vec<CategoryScore>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryScore>(
            r#"
            SELECT user_id, category_id, score, updated_at
            FROM category_scores
            WHERE user_id = $1
            ORDER BY category_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
