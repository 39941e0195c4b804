// tests/postgres_repository_tests.rs
//
// Needs a running Postgres reachable through DATABASE_URL:
//     cargo test --test postgres_repository_tests -- --ignored

use assessment_api::{
    models::{
        assessment::{Assessment, CreateAssessmentRequest},
        assessment_result::AttemptOutcome,
        question::{CreateQuestionRequest, QuestionType},
    },
    repository::{AssessmentRepository, PgRepository, RepoError},
};
use sqlx::postgres::PgPoolOptions;

async fn setup() -> (PgRepository, Assessment) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let repo = PgRepository::new(pool);
    let name = format!("cat_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let category = repo.create_category(&name).await.unwrap();
    let assessment = repo
        .create_assessment(&CreateAssessmentRequest {
            category_id: category.id,
            title: "Postgres flow".to_string(),
            description: None,
            duration: None,
            max_attempts: 2,
        })
        .await
        .unwrap();

    (repo, assessment)
}

fn outcome(a: &Assessment, user_id: i64, attempt_number: i32) -> AttemptOutcome {
    AttemptOutcome {
        assessment_id: a.id,
        user_id,
        attempt_number,
        score: 5.0,
        total_points: 2,
        earned_points: 1.0,
        correct_answers: 1,
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn attempt_lifecycle_round_trip() {
    let (repo, a) = setup().await;

    repo.create_question(
        a.id,
        &CreateQuestionRequest {
            text: "Pick A".to_string(),
            question_type: QuestionType::MultipleChoice,
            correct_answer: "A".to_string(),
            points: 2,
            difficulty: Some("easy".to_string()),
            options: vec!["A".to_string(), "B".to_string()],
        },
    )
    .await
    .unwrap();

    let questions = repo.list_questions(a.id).await.unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].question_type, QuestionType::MultipleChoice);
    assert_eq!(questions[0].options, vec!["A", "B"]);
    assert_eq!(
        repo.get_assessment(a.id).await.unwrap().unwrap().total_questions,
        1
    );

    let first = repo.start_attempt(1, a.id, 2).await.unwrap();
    assert_eq!(first.attempt_number, 1);
    assert!(matches!(
        repo.start_attempt(1, a.id, 2).await,
        Err(RepoError::Conflict(_))
    ));

    let done = repo.complete_attempt(&outcome(&a, 1, 1)).await.unwrap();
    assert!(done.completed);
    assert!(done.completed_at.is_some());
    assert!(matches!(
        repo.complete_attempt(&outcome(&a, 1, 1)).await,
        Err(RepoError::NotFound(_))
    ));

    let second = repo.start_attempt(1, a.id, 2).await.unwrap();
    assert_eq!(second.attempt_number, 2);

    repo.abandon_open_attempt(1, a.id).await.unwrap();
    let results = repo.list_results(1, a.id).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_starts_open_one_attempt() {
    let (repo, a) = setup().await;

    let (left, right) = tokio::join!(repo.start_attempt(2, a.id, 2), repo.start_attempt(2, a.id, 2));
    let opened = [left.is_ok(), right.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(opened, 1);

    let results = repo.list_results(2, a.id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].attempt_number, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn category_score_upsert_overwrites() {
    let (repo, a) = setup().await;

    repo.upsert_category_score(3, a.category_id, 8.0).await.unwrap();
    repo.upsert_category_score(3, a.category_id, 2.5).await.unwrap();

    let scores: Vec<_> = repo
        .list_category_scores(3)
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.category_id == a.category_id)
        .collect();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].score, 2.5);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn start_is_refused_once_the_cap_is_recorded() {
    let (repo, a) = setup().await;

    for n in 1..=2 {
        let attempt = repo.start_attempt(4, a.id, 2).await.unwrap();
        assert_eq!(attempt.attempt_number, n);
        repo.complete_attempt(&outcome(&a, 4, n)).await.unwrap();
    }

    assert!(matches!(
        repo.start_attempt(4, a.id, 2).await,
        Err(RepoError::Conflict(_))
    ));
    assert_eq!(repo.list_results(4, a.id).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn failed_category_write_rolls_back_the_result() {
    let (repo, a) = setup().await;
    repo.start_attempt(5, a.id, 2).await.unwrap();

    // No such category: the upsert violates its foreign key.
    assert!(repo.finalize_attempt(&outcome(&a, 5, 1), -1).await.is_err());
    let results = repo.list_results(5, a.id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].completed);

    let done = repo
        .finalize_attempt(&outcome(&a, 5, 1), a.category_id)
        .await
        .unwrap();
    assert!(done.completed);
    assert!(
        repo.list_category_scores(5)
            .await
            .unwrap()
            .iter()
            .any(|s| s.category_id == a.category_id)
    );
}
