// src/handlers/assessment.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        assessment::{AssessmentDetail, AssessmentListParams, AssessmentSummary},
        assessment_result::SubmitAssessmentRequest,
        question::PublicQuestion,
    },
    repository::AssessmentRepository,
    services::AttemptService,
    utils::jwt::Claims,
};

/// Lists all categories.
pub async fn list_categories(
    State(repo): State<Arc<dyn AssessmentRepository>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.list_categories().await?))
}

/// Lists assessments, optionally filtered by category, each with the
/// caller's status on it.
pub async fn list_assessments(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AssessmentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let assessments = repo.list_assessments(params.category_id).await?;

    let mut summaries = Vec::with_capacity(assessments.len());
    for assessment in assessments {
        let eligibility = attempts.eligibility_for(user_id, &assessment).await?;
        summaries.push(AssessmentSummary {
            assessment,
            eligibility,
        });
    }

    Ok(Json(summaries))
}

/// Retrieves an assessment with its questions. Answer keys are not included.
pub async fn get_assessment(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = repo
        .get_assessment(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    let questions = repo
        .list_questions(id)
        .await?
        .into_iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(Json(AssessmentDetail {
        assessment,
        questions,
    }))
}

/// Returns the caller's eligibility for an assessment.
pub async fn get_status(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(attempts.status(user_id, id).await?))
}

/// Starts a new attempt (201) or resumes the open one (200).
pub async fn start_attempt(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let started = attempts.start(user_id, id).await?;

    let status = if started.resumed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(started)))
}

/// Submits the caller's answers and returns the score.
pub async fn submit_assessment(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let submission = attempts.submit(user_id, id, &req.answers).await?;
    Ok(Json(submission))
}

/// Lists the caller's attempts on an assessment.
pub async fn list_results(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(attempts.history(user_id, id).await?))
}

/// Lists the caller's latest score per category.
pub async fn list_category_scores(
    State(repo): State<Arc<dyn AssessmentRepository>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(repo.list_category_scores(user_id).await?))
}
