use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::exams::codec::{encode_questions, exam_from_row};
use crate::exams::generator::{validate_questions, GeneratedExam};
use crate::models::exam::{Exam, ExamRow};

/// Persists a generated exam. The question set is re-validated first so a
/// malformed exam never reaches the table.
pub async fn insert_exam(db: &PgPool, owner_id: i64, exam: &GeneratedExam) -> Result<Exam, AppError> {
    validate_questions(&exam.questions, exam.questions.len())?;
    let questions = encode_questions(&exam.questions)?;

    let row = sqlx::query_as::<_, ExamRow>(
        r#"
        INSERT INTO exams (owner_id, job_role_id, questions, pass_mark, time_limit_minutes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(owner_id)
    .bind(exam.job_role_id)
    .bind(questions)
    .bind(i16::from(exam.pass_mark))
    .bind(i32::try_from(exam.time_limit_minutes).map_err(|_| {
        AppError::Validation("time_limit_minutes is too large".to_string())
    })?)
    .fetch_one(db)
    .await?;

    let exam = exam_from_row(row)?;
    info!(
        "Stored exam {} for role {} ({} questions)",
        exam.id,
        exam.job_role_id,
        exam.questions.len()
    );
    Ok(exam)
}

pub async fn get_exam(db: &PgPool, exam_id: i64) -> Result<Exam, AppError> {
    let row = sqlx::query_as::<_, ExamRow>("SELECT * FROM exams WHERE id = $1")
        .bind(exam_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam {exam_id} not found")))?;
    exam_from_row(row)
}
