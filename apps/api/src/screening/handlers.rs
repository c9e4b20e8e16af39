use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;

use crate::errors::AppError;
use crate::identity::Identity;
use crate::models::attempt::CandidateExam;
use crate::models::resume::{FileType, Resume};
use crate::models::role::JobRole;
use crate::screening::pipeline::screen_resume;
use crate::screening::store::{
    get_resume, get_role, insert_resume, insert_role, list_resumes_for_candidate, NewJobRole,
};
use crate::state::AppState;

pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

/// Candidate-facing screening result. Parsed fields stay server-side.
#[derive(Debug, Serialize)]
pub struct ResumeStatus {
    pub id: i64,
    pub job_role_id: i64,
    pub file_type: FileType,
    pub score: Option<u8>,
    pub qualified: Option<bool>,
    pub reasons: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Resume> for ResumeStatus {
    fn from(r: &Resume) -> Self {
        Self {
            id: r.id,
            job_role_id: r.job_role_id,
            file_type: r.file_type,
            score: r.score,
            qualified: r.qualified,
            reasons: r.reasons.clone(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationsResponse {
    pub resumes: Vec<ResumeStatus>,
    pub attempts: Vec<CandidateExam>,
}

/// POST /api/v1/roles
pub async fn handle_create_role(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<NewJobRole>,
) -> Result<(StatusCode, Json<JobRole>), AppError> {
    identity.require_admin()?;
    let role = insert_role(&state.db, identity.id, &req.normalized()?).await?;
    tracing::info!("Admin {} created job role {} ({})", identity.id, role.id, role.title);
    Ok((StatusCode::CREATED, Json(role)))
}

/// GET /api/v1/roles/:id
pub async fn handle_get_role(
    State(state): State<AppState>,
    _identity: Identity,
    Path(role_id): Path<i64>,
) -> Result<Json<JobRole>, AppError> {
    Ok(Json(get_role(&state.db, role_id).await?))
}

/// POST /api/v1/roles/:id/resumes
/// Multipart with a single `file` field (PDF, DOCX or plain text).
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    identity: Identity,
    Path(role_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeStatus>), AppError> {
    let role = get_role(&state.db, role_id).await?;

    let mut upload: Option<(Bytes, FileType)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_type = FileType::detect(field.content_type(), field.file_name()).ok_or_else(|| {
            AppError::Validation("Unsupported file type; upload PDF, DOCX or TXT".to_string())
        })?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        if data.len() > MAX_RESUME_BYTES {
            return Err(AppError::Validation("Resume exceeds the 10MB limit".to_string()));
        }
        upload = Some((data, file_type));
    }

    let (data, file_type) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    let outcome = screen_resume(
        state.documents.as_ref(),
        state.scorer.as_ref(),
        &role,
        identity.id,
        data,
        file_type,
        state.config.qualification_threshold,
    )
    .await?;

    let resume = insert_resume(&state.db, identity.id, role.id, &outcome).await?;
    Ok((StatusCode::CREATED, Json(ResumeStatus::from(&resume))))
}

/// GET /api/v1/resumes/:id
/// Admins get the full record including parsed fields.
pub async fn handle_get_resume(
    State(state): State<AppState>,
    identity: Identity,
    Path(resume_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let resume = get_resume(&state.db, resume_id).await?;
    if identity.is_admin() {
        return Ok(Json(serde_json::to_value(&resume).map_err(|e| AppError::Internal(e.into()))?));
    }
    if resume.candidate_id != identity.id {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    Ok(Json(
        serde_json::to_value(ResumeStatus::from(&resume)).map_err(|e| AppError::Internal(e.into()))?,
    ))
}

/// GET /api/v1/candidates/me/applications
pub async fn handle_my_applications(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ApplicationsResponse>, AppError> {
    let resumes = list_resumes_for_candidate(&state.db, identity.id).await?;
    let attempts = state.attempts.list_for_candidate(identity.id).await?;
    Ok(Json(ApplicationsResponse {
        resumes: resumes.iter().map(ResumeStatus::from).collect(),
        attempts,
    }))
}
