//! Screening pipeline: store → parse → score → gate.
//!
//! Produces everything a Resume row needs without writing one, so a failure
//! at any stage leaves nothing half-recorded.

use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::{FileType, ParsedResume};
use crate::models::role::JobRole;
use crate::screening::gate::is_qualified;
use crate::screening::parser::parse_stored_resume;
use crate::screening::scoring::{ResumeScorer, ScoreReport};
use crate::screening::storage::{resume_file_ref, DocumentStore};

#[derive(Debug, Clone)]
pub struct ScreeningOutcome {
    pub file_ref: String,
    pub file_type: FileType,
    pub parsed: ParsedResume,
    pub report: ScoreReport,
    pub qualified: bool,
}

pub async fn screen_resume(
    documents: &dyn DocumentStore,
    scorer: &dyn ResumeScorer,
    role: &JobRole,
    candidate_id: i64,
    bytes: Bytes,
    file_type: FileType,
    threshold: u8,
) -> Result<ScreeningOutcome, AppError> {
    let file_ref = resume_file_ref(candidate_id, role.id, file_type.as_str());
    documents.put(&file_ref, bytes, file_type.content_type()).await?;

    let parsed = parse_stored_resume(documents, &file_ref, file_type).await?;
    let report = scorer.score(Some(&parsed), role);
    let qualified = is_qualified(report.score, threshold);

    info!(
        "Screened {file_ref} for role {}: score {} ({}/{} skills), qualified={qualified}",
        role.id, report.score, report.matched_skills, report.required_skills
    );

    Ok(ScreeningOutcome {
        file_ref,
        file_type,
        parsed,
        report,
        qualified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::scoring::KeywordResumeScorer;
    use crate::screening::storage::MemoryDocumentStore;
    use chrono::Utc;

    fn role() -> JobRole {
        JobRole {
            id: 2,
            owner_id: 1,
            title: "Data Engineer".to_string(),
            description: "Pipelines".to_string(),
            responsibilities: "Build ETL".to_string(),
            requirements: "Strong SQL".to_string(),
            required_skills: vec!["SQL".to_string(), "Python".to_string()],
            location: None,
            created_at: Utc::now(),
        }
    }

    const RESUME: &str = "Jane Doe\njane@example.com\n\nSkills\nPython, SQL, Airflow\n";

    #[tokio::test]
    async fn test_qualified_candidate() {
        let store = MemoryDocumentStore::default();
        let outcome = screen_resume(
            &store,
            &KeywordResumeScorer,
            &role(),
            7,
            Bytes::from_static(RESUME.as_bytes()),
            FileType::Txt,
            60,
        )
        .await
        .unwrap();
        assert_eq!(outcome.report.score, 100);
        assert!(outcome.qualified);
        assert!(outcome.file_ref.starts_with("resumes/7/2/"));
        assert!(store.get(&outcome.file_ref).await.is_ok());
    }

    #[tokio::test]
    async fn test_threshold_gates_candidate() {
        let store = MemoryDocumentStore::default();
        let outcome = screen_resume(
            &store,
            &KeywordResumeScorer,
            &role(),
            7,
            Bytes::from_static(b"Jane Doe\n\nSkills\nPython\n"),
            FileType::Txt,
            60,
        )
        .await
        .unwrap();
        assert_eq!(outcome.report.score, 50);
        assert!(!outcome.qualified);
        assert!(outcome.report.reasons.iter().any(|r| r.contains("SQL")));
    }

    #[tokio::test]
    async fn test_unreadable_upload_is_parse_failure() {
        let store = MemoryDocumentStore::default();
        let err = screen_resume(
            &store,
            &KeywordResumeScorer,
            &role(),
            7,
            Bytes::from_static(b"   \n  "),
            FileType::Txt,
            60,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::ParseFailure { .. }));
    }
}
