// tests/api_tests.rs

use std::sync::Arc;

use assessment_api::{
    config::Config,
    repository::{AssessmentRepository, InMemoryRepository},
    routes,
    state::AppState,
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    repo: Arc<InMemoryRepository>,
    client: reqwest::Client,
}

impl TestApp {
    fn token(&self, user_id: i64, role: &str) -> String {
        sign_jwt(user_id, role, SECRET, 600).expect("Failed to sign token")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Spawns the app on a random port, backed by an in-memory store.
async fn spawn_app() -> TestApp {
    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        port: 0,
        default_max_attempts: 2,
        cors_origins: vec!["http://localhost:3000".to_string()],
    };

    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState::new(repo.clone(), config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        repo,
        client: reqwest::Client::new(),
    }
}

/// Creates a category and an assessment with two 1-point multiple-choice
/// questions through the admin API. Returns the assessment id.
async fn seed_assessment(app: &TestApp, max_attempts: i32) -> i64 {
    let admin = app.token(1, "admin");
    let category_name = format!("cat_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let category: Value = app
        .post("/api/admin/categories", &admin, json!({ "name": category_name }))
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .post(
            "/api/admin/assessments",
            &admin,
            json!({
                "category_id": category["id"],
                "title": "Rust fundamentals",
                "description": "Ownership and borrowing",
                "duration": "15 minutes",
                "max_attempts": max_attempts
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let assessment: Value = response.json().await.unwrap();
    let id = assessment["id"].as_i64().unwrap();

    for (text, answer) in [("Which keyword moves?", "move"), ("Borrow operator?", "&")] {
        let response = app
            .post(
                &format!("/api/admin/assessments/{}/questions", id),
                &admin,
                json!({
                    "text": text,
                    "type": "multiple_choice",
                    "correct_answer": answer,
                    "points": 1,
                    "options": ["move", "&", "mut"]
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
    }

    id
}

async fn answer_map(app: &TestApp, assessment_id: i64, right: usize) -> Value {
    let questions = app.repo.list_questions(assessment_id).await.unwrap();
    let mut map = serde_json::Map::new();
    for (i, q) in questions.iter().enumerate() {
        let answer = if i < right { q.correct_answer.clone() } else { "mut".to_string() };
        map.insert(q.id.to_string(), Value::String(answer));
    }
    json!({ "answers": map })
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn missing_token_is_401() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/assessments"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn students_cannot_use_admin_routes() {
    let app = spawn_app().await;
    let student = app.token(2, "student");

    let response = app
        .post("/api/admin/categories", &student, json!({ "name": "Hacking" }))
        .await;

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn student_view_hides_answer_keys() {
    let app = spawn_app().await;
    let id = seed_assessment(&app, 2).await;
    let student = app.token(2, "student");

    let body: Value = app
        .get(&format!("/api/assessments/{}", id), &student)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["total_questions"], 2);
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    for q in questions {
        assert!(q.get("correct_answer").is_none());
        assert_eq!(q["type"], "multiple_choice");
    }
}

#[tokio::test]
async fn full_attempt_flow() {
    let app = spawn_app().await;
    let id = seed_assessment(&app, 2).await;
    let student = app.token(7, "student");

    // Not started yet
    let status: Value = app
        .get(&format!("/api/assessments/{}/status", id), &student)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "not_started");
    assert_eq!(status["can_retake"], true);

    // Start, then starting again resumes
    let started = app
        .post(&format!("/api/assessments/{}/attempts", id), &student, json!({}))
        .await;
    assert_eq!(started.status().as_u16(), 201);
    let resumed = app
        .post(&format!("/api/assessments/{}/attempts", id), &student, json!({}))
        .await;
    assert_eq!(resumed.status().as_u16(), 200);
    let resumed: Value = resumed.json().await.unwrap();
    assert_eq!(resumed["resumed"], true);
    assert_eq!(resumed["attempt"]["attempt_number"], 1);

    let status: Value = app
        .get(&format!("/api/assessments/{}/status", id), &student)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "in_progress");
    assert_eq!(status["can_retake"], false);

    // First submission: one right, one wrong
    let response = app
        .post(
            &format!("/api/assessments/{}/submit", id),
            &student,
            answer_map(&app, id, 1).await,
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let first: Value = response.json().await.unwrap();
    assert_eq!(first["score"], 5.0);
    assert_eq!(first["total_points"], 2);
    assert_eq!(first["correct_answers"], 1);
    assert_eq!(first["attempt_number"], 1);
    assert_eq!(first["eligibility"]["status"], "completed");
    assert_eq!(first["eligibility"]["can_retake"], true);

    // Second submission: all right, cap reached
    let second: Value = app
        .post(
            &format!("/api/assessments/{}/submit", id),
            &student,
            answer_map(&app, id, 2).await,
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(second["score"], 10.0);
    assert_eq!(second["attempt_number"], 2);
    assert_eq!(second["eligibility"]["can_retake"], false);

    // Third is refused
    let third = app
        .post(
            &format!("/api/assessments/{}/submit", id),
            &student,
            answer_map(&app, id, 2).await,
        )
        .await;
    assert_eq!(third.status().as_u16(), 409);

    // History and category aggregate
    let history: Value = app
        .get(&format!("/api/assessments/{}/results", id), &student)
        .await
        .json()
        .await
        .unwrap();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r["completed"] == true));

    let scores: Value = app
        .get("/api/me/category-scores", &student)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(scores.as_array().unwrap().len(), 1);
    assert_eq!(scores[0]["score"], 10.0);
}

#[tokio::test]
async fn failed_persistence_keeps_attempt_retriable() {
    let app = spawn_app().await;
    let id = seed_assessment(&app, 2).await;
    let student = app.token(9, "student");

    app.repo.fail_result_writes(true);
    let failed = app
        .post(
            &format!("/api/assessments/{}/submit", id),
            &student,
            answer_map(&app, id, 2).await,
        )
        .await;
    assert_eq!(failed.status().as_u16(), 500);

    let status: Value = app
        .get(&format!("/api/assessments/{}/status", id), &student)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "in_progress");

    app.repo.fail_result_writes(false);
    let retried: Value = app
        .post(
            &format!("/api/assessments/{}/submit", id),
            &student,
            answer_map(&app, id, 2).await,
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(retried["attempt_number"], 1);
    assert_eq!(retried["score"], 10.0);
}

#[tokio::test]
async fn admin_can_abandon_stuck_attempt() {
    let app = spawn_app().await;
    let id = seed_assessment(&app, 1).await;
    let student = app.token(11, "student");
    let admin = app.token(1, "admin");

    app.post(&format!("/api/assessments/{}/attempts", id), &student, json!({}))
        .await;

    let response = app
        .post(
            &format!("/api/admin/assessments/{}/attempts/11/abandon", id),
            &admin,
            json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 204);

    let status: Value = app
        .get(&format!("/api/assessments/{}/status", id), &student)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "not_started");

    let again = app
        .post(
            &format!("/api/admin/assessments/{}/attempts/11/abandon", id),
            &admin,
            json!({}),
        )
        .await;
    assert_eq!(again.status().as_u16(), 404);
}

#[tokio::test]
async fn empty_assessment_cannot_be_submitted() {
    let app = spawn_app().await;
    let admin = app.token(1, "admin");
    let student = app.token(3, "student");

    let category: Value = app
        .post("/api/admin/categories", &admin, json!({ "name": "Empty" }))
        .await
        .json()
        .await
        .unwrap();
    let assessment: Value = app
        .post(
            "/api/admin/assessments",
            &admin,
            json!({ "category_id": category["id"], "title": "No questions" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(assessment["max_attempts"], 2);

    let response = app
        .post(
            &format!("/api/assessments/{}/submit", assessment["id"]),
            &student,
            json!({ "answers": {} }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn invalid_question_is_rejected() {
    let app = spawn_app().await;
    let id = seed_assessment(&app, 2).await;
    let admin = app.token(1, "admin");

    let zero_points = app
        .post(
            &format!("/api/admin/assessments/{}/questions", id),
            &admin,
            json!({ "text": "Explain lifetimes", "type": "open_ended", "points": 0 }),
        )
        .await;
    assert_eq!(zero_points.status().as_u16(), 400);

    let answer_not_an_option = app
        .post(
            &format!("/api/admin/assessments/{}/questions", id),
            &admin,
            json!({
                "text": "Pick one",
                "type": "multiple_choice",
                "correct_answer": "z",
                "points": 1,
                "options": ["x", "y"]
            }),
        )
        .await;
    assert_eq!(answer_not_an_option.status().as_u16(), 400);
}

#[tokio::test]
async fn question_update_keeps_answer_key_consistent() {
    let app = spawn_app().await;
    let id = seed_assessment(&app, 2).await;
    let admin = app.token(1, "admin");
    let question = app.repo.list_questions(id).await.unwrap().remove(0);
    let path = format!("/api/admin/questions/{}", question.id);

    let not_an_option = app.put(&path, &admin, json!({ "correct_answer": "borrow" })).await;
    assert_eq!(not_an_option.status().as_u16(), 400);

    let no_options = app
        .put(&path, &admin, json!({ "options": [], "correct_answer": "move" }))
        .await;
    assert_eq!(no_options.status().as_u16(), 400);

    let unchanged = app.repo.list_questions(id).await.unwrap().remove(0);
    assert_eq!(unchanged, question);

    let reworded: Value = app
        .put(
            &path,
            &admin,
            json!({ "correct_answer": "mut", "text": "Which keyword allows mutation?" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(reworded["correct_answer"], "mut");

    let missing = app
        .put("/api/admin/questions/999999", &admin, json!({ "points": 2 }))
        .await;
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn admin_question_text_is_sanitized() {
    let app = spawn_app().await;
    let id = seed_assessment(&app, 2).await;
    let admin = app.token(1, "admin");

    let created: Value = app
        .post(
            &format!("/api/admin/assessments/{}/questions", id),
            &admin,
            json!({
                "text": "<b>Explain</b><script>alert(1)</script>",
                "type": "open_ended",
                "points": 4
            }),
        )
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(created["text"], "<b>Explain</b>");
}
