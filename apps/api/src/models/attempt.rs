use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::errors::AppError;

/// Candidate answers keyed by question id.
pub type Answers = BTreeMap<String, String>;

/// Lifecycle of one exam attempt. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    InProgress,
    Completed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttemptStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AttemptStatus::Pending),
            "in_progress" => Ok(AttemptStatus::InProgress),
            "completed" => Ok(AttemptStatus::Completed),
            other => Err(AppError::InvariantViolation(format!(
                "unknown attempt status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    NoFace,
    MultipleFaces,
    LookingAway,
    TabSwitch,
}

/// An anomaly signal recorded while an attempt is in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProctoringFlag {
    pub at: DateTime<Utc>,
    pub kind: FlagKind,
    #[serde(default)]
    pub detail: Option<String>,
}

/// One candidate's attempt at one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateExam {
    pub id: i64,
    pub candidate_id: i64,
    pub exam_id: i64,
    pub status: AttemptStatus,
    pub score: Option<u8>,
    pub passed: Option<bool>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub answers: Option<Answers>,
    pub flagged: bool,
    pub flags: Vec<ProctoringFlag>,
    /// Bumped on every write; saves are conditional on it.
    pub version: i32,
}

impl CandidateExam {
    pub fn new_pending(id: i64, candidate_id: i64, exam_id: i64) -> Self {
        Self {
            id,
            candidate_id,
            exam_id,
            status: AttemptStatus::Pending,
            score: None,
            passed: None,
            started_at: None,
            completed_at: None,
            answers: None,
            flagged: false,
            flags: Vec::new(),
            version: 0,
        }
    }
}

/// Row shape of the `candidate_exams` table.
#[derive(Debug, Clone, FromRow)]
pub struct CandidateExamRow {
    pub id: i64,
    pub candidate_id: i64,
    pub exam_id: i64,
    pub status: String,
    pub score: Option<i16>,
    pub passed: Option<bool>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub answers: Option<Value>,
    pub flagged: bool,
    pub flags: Value,
    pub version: i32,
}

impl TryFrom<CandidateExamRow> for CandidateExam {
    type Error = AppError;

    fn try_from(row: CandidateExamRow) -> Result<Self, Self::Error> {
        let corrupt =
            |what: &str, e: serde_json::Error| AppError::InvariantViolation(format!(
                "attempt {} has malformed {what}: {e}",
                row.id
            ));
        let answers = row
            .answers
            .clone()
            .map(serde_json::from_value::<Answers>)
            .transpose()
            .map_err(|e| corrupt("answers", e))?;
        let flags = serde_json::from_value::<Vec<ProctoringFlag>>(row.flags.clone())
            .map_err(|e| corrupt("flags", e))?;
        let score = match row.score {
            Some(s) => Some(u8::try_from(s).ok().filter(|s| *s <= 100).ok_or_else(|| {
                AppError::InvariantViolation(format!("attempt {} has out-of-range score {s}", row.id))
            })?),
            None => None,
        };

        Ok(CandidateExam {
            id: row.id,
            candidate_id: row.candidate_id,
            exam_id: row.exam_id,
            status: row.status.parse()?,
            score,
            passed: row.passed,
            started_at: row.started_at,
            completed_at: row.completed_at,
            answers,
            flagged: row.flagged,
            flags,
            version: row.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trips_through_text_column() {
        for status in [
            AttemptStatus::Pending,
            AttemptStatus::InProgress,
            AttemptStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<AttemptStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<AttemptStatus>().is_err());
    }

    #[test]
    fn test_flag_kind_uses_snake_case() {
        let flag: ProctoringFlag = serde_json::from_value(json!({
            "at": "2026-01-05T10:00:00Z",
            "kind": "multiple_faces"
        }))
        .unwrap();
        assert_eq!(flag.kind, FlagKind::MultipleFaces);
        assert!(flag.detail.is_none());
    }

    #[test]
    fn test_row_decodes_answers_and_flags() {
        let row = CandidateExamRow {
            id: 11,
            candidate_id: 7,
            exam_id: 3,
            status: "in_progress".to_string(),
            score: None,
            passed: None,
            started_at: Some(Utc::now()),
            completed_at: None,
            answers: Some(json!({"q1": "B"})),
            flagged: false,
            flags: json!([{"at": "2026-01-05T10:00:00Z", "kind": "tab_switch", "detail": "blur"}]),
            version: 2,
        };
        let attempt = CandidateExam::try_from(row).unwrap();
        assert_eq!(attempt.status, AttemptStatus::InProgress);
        assert_eq!(attempt.answers.unwrap()["q1"], "B");
        assert_eq!(attempt.flags[0].kind, FlagKind::TabSwitch);
    }
}
