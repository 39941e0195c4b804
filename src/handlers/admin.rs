// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        assessment::{CreateAssessmentRequest, CreateCategoryRequest, UpdateAssessmentRequest},
        question::{CreateQuestionRequest, UpdateQuestionRequest},
    },
    repository::AssessmentRepository,
    utils::html::{clean_html, clean_opt},
};

/// Creates a category.
/// Admin only.
pub async fn create_category(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = repo.create_category(&clean_html(&payload.name)).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Creates a new assessment.
/// Admin only.
pub async fn create_assessment(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Json(mut payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    payload.title = clean_html(&payload.title);
    payload.description = clean_opt(payload.description);
    payload.duration = clean_opt(payload.duration);

    let assessment = repo.create_assessment(&payload).await?;
    tracing::info!("Created assessment {} '{}'", assessment.id, assessment.title);

    Ok((StatusCode::CREATED, Json(assessment)))
}

/// Updates an assessment. Absent fields are left unchanged.
/// Admin only.
pub async fn update_assessment(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    payload.title = clean_opt(payload.title);
    payload.description = clean_opt(payload.description);
    payload.duration = clean_opt(payload.duration);

    Ok(Json(repo.update_assessment(id, payload).await?))
}

/// Deletes an assessment together with its questions and results.
/// Admin only.
pub async fn delete_assessment(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    repo.delete_assessment(id).await?;
    tracing::info!("Deleted assessment {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Lists the questions of an assessment including answer keys.
/// Admin only.
pub async fn list_questions(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    repo.get_assessment(assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    Ok(Json(repo.list_questions(assessment_id).await?))
}

/// Adds a question to an assessment.
/// Admin only.
pub async fn create_question(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Path(assessment_id): Path<i64>,
    Json(mut payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.check_consistency().map_err(AppError::BadRequest)?;

    // Answer keys and options are compared verbatim, so only the prompt is cleaned.
    payload.text = clean_html(&payload.text);

    let question = repo.create_question(assessment_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question. Absent fields are left unchanged.
/// The merged question must still satisfy the create rules.
/// Admin only.
pub async fn update_question(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.text = clean_opt(payload.text);

    let mut merged = repo
        .get_question(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    payload.clone().apply(&mut merged);
    merged.check_consistency().map_err(AppError::BadRequest)?;

    Ok(Json(repo.update_question(id, payload).await?))
}

/// Deletes a question.
/// Admin only.
pub async fn delete_question(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    repo.delete_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drops a user's stuck open attempt so they can start over.
/// Admin only.
pub async fn abandon_attempt(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Path((assessment_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    repo.abandon_open_attempt(user_id, assessment_id).await?;
    tracing::warn!(
        "Abandoned open attempt of user {} on assessment {}",
        user_id,
        assessment_id
    );
    Ok(StatusCode::NO_CONTENT)
}
