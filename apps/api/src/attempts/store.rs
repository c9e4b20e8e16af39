//! Attempt persistence. Every save is conditional on the version the caller
//! loaded; a stale save returns `None` instead of overwriting.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::exams::store::get_exam;
use crate::models::attempt::{CandidateExam, CandidateExamRow};
use crate::models::exam::Exam;

/// Result of an assign: the pair's live attempt and whether this call created it.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub attempt: CandidateExam,
    pub created: bool,
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn exam(&self, exam_id: i64) -> Result<Exam, AppError>;

    /// Creates a pending attempt, or returns the pair's live attempt if one exists.
    async fn assign(&self, candidate_id: i64, exam_id: i64) -> Result<Assignment, AppError>;

    async fn get(&self, attempt_id: i64) -> Result<CandidateExam, AppError>;

    /// Writes `attempt` if the stored version still equals `attempt.version`.
    /// Returns the stored attempt with its bumped version, or `None` when stale.
    async fn save(&self, attempt: &CandidateExam) -> Result<Option<CandidateExam>, AppError>;

    async fn list_for_candidate(&self, candidate_id: i64) -> Result<Vec<CandidateExam>, AppError>;
}

pub struct PgAttemptStore {
    db: PgPool,
}

impl PgAttemptStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Inserts racing against a completion of the live attempt retry this often.
const ASSIGN_ATTEMPTS: u32 = 3;

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn exam(&self, exam_id: i64) -> Result<Exam, AppError> {
        get_exam(&self.db, exam_id).await
    }

    async fn assign(&self, candidate_id: i64, exam_id: i64) -> Result<Assignment, AppError> {
        for _ in 0..ASSIGN_ATTEMPTS {
            let inserted = sqlx::query_as::<_, CandidateExamRow>(
                r#"
                INSERT INTO candidate_exams (candidate_id, exam_id, status)
                VALUES ($1, $2, 'pending')
                ON CONFLICT (candidate_id, exam_id) WHERE status <> 'completed' DO NOTHING
                RETURNING *
                "#,
            )
            .bind(candidate_id)
            .bind(exam_id)
            .fetch_optional(&self.db)
            .await?;

            if let Some(row) = inserted {
                return Ok(Assignment {
                    attempt: row.try_into()?,
                    created: true,
                });
            }

            let live = sqlx::query_as::<_, CandidateExamRow>(
                r#"
                SELECT * FROM candidate_exams
                WHERE candidate_id = $1 AND exam_id = $2 AND status <> 'completed'
                "#,
            )
            .bind(candidate_id)
            .bind(exam_id)
            .fetch_optional(&self.db)
            .await?;

            if let Some(row) = live {
                return Ok(Assignment {
                    attempt: row.try_into()?,
                    created: false,
                });
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "could not assign exam {exam_id} to candidate {candidate_id}"
        )))
    }

    async fn get(&self, attempt_id: i64) -> Result<CandidateExam, AppError> {
        sqlx::query_as::<_, CandidateExamRow>("SELECT * FROM candidate_exams WHERE id = $1")
            .bind(attempt_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt {attempt_id} not found")))?
            .try_into()
    }

    async fn save(&self, attempt: &CandidateExam) -> Result<Option<CandidateExam>, AppError> {
        let answers = attempt
            .answers
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| AppError::Internal(e.into()))?;
        let flags: Value =
            serde_json::to_value(&attempt.flags).map_err(|e| AppError::Internal(e.into()))?;

        let row = sqlx::query_as::<_, CandidateExamRow>(
            r#"
            UPDATE candidate_exams
            SET status = $1, score = $2, passed = $3, started_at = $4, completed_at = $5,
                answers = $6, flagged = $7, flags = $8, version = version + 1
            WHERE id = $9 AND version = $10
            RETURNING *
            "#,
        )
        .bind(attempt.status.as_str())
        .bind(attempt.score.map(i16::from))
        .bind(attempt.passed)
        .bind(attempt.started_at)
        .bind(attempt.completed_at)
        .bind(answers)
        .bind(attempt.flagged)
        .bind(flags)
        .bind(attempt.id)
        .bind(attempt.version)
        .fetch_optional(&self.db)
        .await?;

        row.map(CandidateExam::try_from).transpose()
    }

    async fn list_for_candidate(&self, candidate_id: i64) -> Result<Vec<CandidateExam>, AppError> {
        sqlx::query_as::<_, CandidateExamRow>(
            "SELECT * FROM candidate_exams WHERE candidate_id = $1 ORDER BY id",
        )
        .bind(candidate_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(CandidateExam::try_from)
        .collect()
    }
}

#[cfg(test)]
pub use memory::MemoryAttemptStore;
