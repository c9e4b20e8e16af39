//! Storage encoding of exam questions.
//!
//! Rows written before the typed column may hold the question list as a
//! JSON-encoded string instead of a JSON array. Both decode to the same
//! `Vec<Question>`; only the array shape is ever written.

use serde_json::Value;

use crate::errors::AppError;
use crate::models::exam::{Exam, ExamRow, Question};

pub fn encode_questions(questions: &[Question]) -> Result<Value, AppError> {
    serde_json::to_value(questions)
        .map_err(|e| AppError::InvariantViolation(format!("questions are not serializable: {e}")))
}

pub fn decode_questions(value: Value) -> Result<Vec<Question>, AppError> {
    let malformed = |e: serde_json::Error| {
        AppError::InvariantViolation(format!("stored questions are malformed: {e}"))
    };
    match value {
        Value::Array(_) => serde_json::from_value(value).map_err(malformed),
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(malformed),
        other => Err(AppError::InvariantViolation(format!(
            "stored questions must be an array, found {}",
            json_kind(&other)
        ))),
    }
}

pub fn exam_from_row(row: ExamRow) -> Result<Exam, AppError> {
    let out_of_range = |field: &str| {
        AppError::InvariantViolation(format!("exam {} has out-of-range {field}", row.id))
    };
    let pass_mark = u8::try_from(row.pass_mark)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| out_of_range("pass_mark"))?;
    let time_limit_minutes =
        u32::try_from(row.time_limit_minutes).map_err(|_| out_of_range("time_limit_minutes"))?;

    Ok(Exam {
        id: row.id,
        owner_id: row.owner_id,
        job_role_id: row.job_role_id,
        questions: decode_questions(row.questions)?,
        pass_mark,
        time_limit_minutes,
        created_at: row.created_at,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
