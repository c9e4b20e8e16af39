use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::attempts::service::GradedAttempt;
use crate::errors::AppError;
use crate::exams::store::get_exam;
use crate::identity::Identity;
use crate::models::attempt::{Answers, CandidateExam, FlagKind, ProctoringFlag};
use crate::screening::store::has_qualified_resume;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AssignRequest {
    /// Admins assign on behalf of a candidate; candidates assign themselves.
    pub candidate_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    pub kind: FlagKind,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswersRequest {
    pub answers: Answers,
}

/// Candidates may only see and act on their own attempts.
async fn owned_attempt(state: &AppState, identity: &Identity, attempt_id: i64) -> Result<CandidateExam, AppError> {
    let attempt = state.attempts.get(attempt_id).await?;
    if !identity.is_admin() && attempt.candidate_id != identity.id {
        return Err(AppError::NotFound(format!("Attempt {attempt_id} not found")));
    }
    Ok(attempt)
}

/// POST /api/v1/exams/:id/assign
pub async fn handle_assign(
    State(state): State<AppState>,
    identity: Identity,
    Path(exam_id): Path<i64>,
    body: Option<Json<AssignRequest>>,
) -> Result<(StatusCode, Json<CandidateExam>), AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let candidate_id = match (identity.is_admin(), request.candidate_id) {
        (true, Some(id)) => id,
        (true, None) => {
            return Err(AppError::Validation(
                "candidate_id is required when an administrator assigns an exam".to_string(),
            ))
        }
        (false, Some(id)) if id != identity.id => return Err(AppError::Forbidden),
        (false, _) => identity.id,
    };

    let exam = get_exam(&state.db, exam_id).await?;
    if !has_qualified_resume(&state.db, candidate_id, exam.job_role_id).await? {
        return Err(AppError::Forbidden);
    }

    let assignment = state.attempts.assign(candidate_id, exam_id).await?;
    let status = if assignment.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(assignment.attempt)))
}

/// GET /api/v1/attempts/:id
pub async fn handle_get_attempt(
    State(state): State<AppState>,
    identity: Identity,
    Path(attempt_id): Path<i64>,
) -> Result<Json<CandidateExam>, AppError> {
    Ok(Json(owned_attempt(&state, &identity, attempt_id).await?))
}

/// POST /api/v1/attempts/:id/start
pub async fn handle_start(
    State(state): State<AppState>,
    identity: Identity,
    Path(attempt_id): Path<i64>,
) -> Result<Json<CandidateExam>, AppError> {
    owned_attempt(&state, &identity, attempt_id).await?;
    Ok(Json(state.attempts.start(attempt_id).await?))
}

/// POST /api/v1/attempts/:id/flags
pub async fn handle_record_flag(
    State(state): State<AppState>,
    identity: Identity,
    Path(attempt_id): Path<i64>,
    Json(req): Json<FlagRequest>,
) -> Result<Json<CandidateExam>, AppError> {
    owned_attempt(&state, &identity, attempt_id).await?;
    let flag = ProctoringFlag {
        at: Utc::now(),
        kind: req.kind,
        detail: req.detail,
    };
    Ok(Json(state.attempts.record_flag(attempt_id, flag).await?))
}

/// PUT /api/v1/attempts/:id/answers
pub async fn handle_save_progress(
    State(state): State<AppState>,
    identity: Identity,
    Path(attempt_id): Path<i64>,
    Json(req): Json<AnswersRequest>,
) -> Result<Json<CandidateExam>, AppError> {
    owned_attempt(&state, &identity, attempt_id).await?;
    Ok(Json(state.attempts.save_progress(attempt_id, req.answers).await?))
}

/// POST /api/v1/attempts/:id/submit
pub async fn handle_submit(
    State(state): State<AppState>,
    identity: Identity,
    Path(attempt_id): Path<i64>,
    Json(req): Json<AnswersRequest>,
) -> Result<Json<GradedAttempt>, AppError> {
    owned_attempt(&state, &identity, attempt_id).await?;
    Ok(Json(state.attempts.submit_answers(attempt_id, req.answers).await?))
}

/// POST /api/v1/attempts/:id/expire
pub async fn handle_expire(
    State(state): State<AppState>,
    identity: Identity,
    Path(attempt_id): Path<i64>,
) -> Result<Json<GradedAttempt>, AppError> {
    owned_attempt(&state, &identity, attempt_id).await?;
    Ok(Json(state.attempts.expire(attempt_id).await?))
}
