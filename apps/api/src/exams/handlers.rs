use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::exams::generator::{generate_exam, ExamParams};
use crate::exams::store::{get_exam, insert_exam};
use crate::identity::Identity;
use crate::models::exam::{Exam, PublicQuestion};
use crate::screening::store::get_role;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateExamRequest {
    pub job_role_id: i64,
    pub question_count: usize,
    pub pass_mark: Option<u8>,
    pub time_limit_minutes: Option<u32>,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreatedExam {
    pub exam: Exam,
    /// Which question source produced the exam.
    pub source: &'static str,
}

/// What a candidate sees: no answer keys.
#[derive(Debug, Serialize)]
pub struct CandidateExamView {
    pub id: i64,
    pub job_role_id: i64,
    pub pass_mark: u8,
    pub time_limit_minutes: u32,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Exam> for CandidateExamView {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id,
            job_role_id: exam.job_role_id,
            pass_mark: exam.pass_mark,
            time_limit_minutes: exam.time_limit_minutes,
            questions: exam.questions.iter().map(|q| q.public_view()).collect(),
        }
    }
}

/// POST /api/v1/exams
pub async fn handle_create_exam(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateExamRequest>,
) -> Result<(StatusCode, Json<CreatedExam>), AppError> {
    identity.require_admin()?;
    let role = get_role(&state.db, req.job_role_id).await?;
    if role.owner_id != identity.id {
        return Err(AppError::Forbidden);
    }

    let params = ExamParams {
        question_count: req.question_count,
        pass_mark: req.pass_mark.unwrap_or(state.config.default_pass_mark),
        time_limit_minutes: req
            .time_limit_minutes
            .unwrap_or(state.config.default_time_limit_minutes),
        seed: req.seed,
    };

    let generated = generate_exam(
        state.questions.as_ref(),
        &role,
        &params,
        state.config.generation_timeout,
    )
    .await?;
    let exam = insert_exam(&state.db, identity.id, &generated).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedExam {
            exam,
            source: generated.source,
        }),
    ))
}

/// GET /api/v1/exams/:id
pub async fn handle_get_exam(
    State(state): State<AppState>,
    identity: Identity,
    Path(exam_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let exam = get_exam(&state.db, exam_id).await?;
    let body = if identity.is_admin() {
        serde_json::to_value(&exam)
    } else {
        serde_json::to_value(CandidateExamView::from(&exam))
    }
    .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(body))
}
