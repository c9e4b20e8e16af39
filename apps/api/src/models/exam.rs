use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// A single exam question. `id` is unique within its exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_answer: String,
    },
    OpenEnded {
        #[serde(default)]
        correct_answer: Option<String>,
    },
}

impl Question {
    /// The candidate-facing shape: options without the answer key.
    pub fn public_view(&self) -> PublicQuestion {
        let (question_type, options) = match &self.kind {
            QuestionKind::MultipleChoice { options, .. } => {
                ("multiple_choice", Some(options.clone()))
            }
            QuestionKind::OpenEnded { .. } => ("open_ended", None),
        };
        PublicQuestion {
            id: self.id.clone(),
            text: self.text.clone(),
            question_type,
            options,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// A generated exam for one job role. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub owner_id: i64,
    pub job_role_id: i64,
    pub questions: Vec<Question>,
    pub pass_mark: u8,
    pub time_limit_minutes: u32,
    pub created_at: DateTime<Utc>,
}

/// Row shape of the `exams` table. `questions` is decoded by `exams::codec`.
#[derive(Debug, Clone, FromRow)]
pub struct ExamRow {
    pub id: i64,
    pub owner_id: i64,
    pub job_role_id: i64,
    pub questions: Value,
    pub pass_mark: i16,
    pub time_limit_minutes: i32,
    pub created_at: DateTime<Utc>,
}
