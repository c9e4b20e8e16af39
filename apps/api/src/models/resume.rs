use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::errors::AppError;

/// Declared type of an uploaded resume document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Pdf,
    Doc,
    Docx,
    Txt,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Doc => "doc",
            FileType::Docx => "docx",
            FileType::Txt => "txt",
        }
    }

    /// Resolves a file type from a MIME content type, falling back to the file extension.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Option<Self> {
        let from_mime = content_type.and_then(|ct| match ct {
            "application/pdf" => Some(FileType::Pdf),
            "application/msword" => Some(FileType::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(FileType::Docx)
            }
            "text/plain" => Some(FileType::Txt),
            _ => None,
        });
        from_mime.or_else(|| {
            let ext = file_name?.rsplit_once('.')?.1.to_ascii_lowercase();
            ext.parse().ok()
        })
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileType::Pdf => "application/pdf",
            FileType::Doc => "application/msword",
            FileType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileType::Txt => "text/plain",
        }
    }
}

impl std::str::FromStr for FileType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(FileType::Pdf),
            "doc" => Ok(FileType::Doc),
            "docx" => Ok(FileType::Docx),
            "txt" => Ok(FileType::Txt),
            other => Err(AppError::Validation(format!(
                "unsupported resume file type '{other}' (expected pdf, doc or docx)"
            ))),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured fields extracted from a resume. Every field is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
    pub skills: Vec<String>,
    pub location: Option<String>,
}

/// A candidate's application for one job role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: i64,
    pub candidate_id: i64,
    pub job_role_id: i64,
    pub file_ref: String,
    pub file_type: FileType,
    pub parsed: Option<ParsedResume>,
    pub score: Option<u8>,
    pub reasons: Vec<String>,
    pub qualified: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// Row shape of the `resumes` table.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: i64,
    pub candidate_id: i64,
    pub job_role_id: i64,
    pub file_ref: String,
    pub file_type: String,
    pub parsed: Option<Json<ParsedResume>>,
    pub score: Option<i16>,
    pub reasons: Vec<String>,
    pub qualified: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ResumeRow> for Resume {
    type Error = AppError;

    fn try_from(row: ResumeRow) -> Result<Self, Self::Error> {
        let score = row
            .score
            .map(|s| {
                u8::try_from(s)
                    .ok()
                    .filter(|s| *s <= 100)
                    .ok_or_else(|| {
                        AppError::InvariantViolation(format!(
                            "resume {} has out-of-range score {s}",
                            row.id
                        ))
                    })
            })
            .transpose()?;

        Ok(Resume {
            id: row.id,
            candidate_id: row.candidate_id,
            job_role_id: row.job_role_id,
            file_ref: row.file_ref,
            file_type: row.file_type.parse()?,
            parsed: row.parsed.map(|p| p.0),
            score,
            reasons: row.reasons,
            qualified: row.qualified,
            created_at: row.created_at,
        })
    }
}
