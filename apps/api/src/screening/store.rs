//! Job role and resume persistence.

use serde::Deserialize;
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::resume::{Resume, ResumeRow};
use crate::models::role::JobRole;
use crate::screening::pipeline::ScreeningOutcome;

#[derive(Debug, Clone, Deserialize)]
pub struct NewJobRole {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub responsibilities: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewJobRole {
    /// Trims fields, drops blank and repeated skills (case-insensitive),
    /// keeping declaration order.
    pub fn normalized(self) -> Result<Self, AppError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        let mut required_skills: Vec<String> = Vec::with_capacity(self.required_skills.len());
        for skill in self.required_skills.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            if !required_skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                required_skills.push(skill.to_string());
            }
        }
        Ok(Self {
            title,
            description: self.description.trim().to_string(),
            responsibilities: self.responsibilities.trim().to_string(),
            requirements: self.requirements.trim().to_string(),
            required_skills,
            location: self
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
        })
    }
}

pub async fn insert_role(db: &PgPool, owner_id: i64, role: &NewJobRole) -> Result<JobRole, AppError> {
    Ok(sqlx::query_as::<_, JobRole>(
        r#"
        INSERT INTO job_roles
            (owner_id, title, description, responsibilities, requirements, required_skills, location)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(owner_id)
    .bind(&role.title)
    .bind(&role.description)
    .bind(&role.responsibilities)
    .bind(&role.requirements)
    .bind(&role.required_skills)
    .bind(&role.location)
    .fetch_one(db)
    .await?)
}

pub async fn get_role(db: &PgPool, role_id: i64) -> Result<JobRole, AppError> {
    sqlx::query_as::<_, JobRole>("SELECT * FROM job_roles WHERE id = $1")
        .bind(role_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job role {role_id} not found")))
}

/// Records a fully screened resume in one statement.
pub async fn insert_resume(
    db: &PgPool,
    candidate_id: i64,
    job_role_id: i64,
    outcome: &ScreeningOutcome,
) -> Result<Resume, AppError> {
    sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes
            (candidate_id, job_role_id, file_ref, file_type, parsed, score, reasons, qualified)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(candidate_id)
    .bind(job_role_id)
    .bind(&outcome.file_ref)
    .bind(outcome.file_type.as_str())
    .bind(SqlJson(&outcome.parsed))
    .bind(i16::from(outcome.report.score))
    .bind(&outcome.report.reasons)
    .bind(outcome.qualified)
    .fetch_one(db)
    .await?
    .try_into()
}

pub async fn get_resume(db: &PgPool, resume_id: i64) -> Result<Resume, AppError> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(resume_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?
        .try_into()
}

pub async fn list_resumes_for_candidate(db: &PgPool, candidate_id: i64) -> Result<Vec<Resume>, AppError> {
    sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE candidate_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(candidate_id)
    .fetch_all(db)
    .await?
    .into_iter()
    .map(Resume::try_from)
    .collect()
}

pub async fn has_qualified_resume(db: &PgPool, candidate_id: i64, job_role_id: i64) -> Result<bool, AppError> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM resumes WHERE candidate_id = $1 AND job_role_id = $2 AND qualified)",
    )
    .bind(candidate_id)
    .bind(job_role_id)
    .fetch_one(db)
    .await?)
}
