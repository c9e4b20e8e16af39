use std::sync::Arc;

use sqlx::PgPool;

use crate::attempts::service::AttemptService;
use crate::config::Config;
use crate::exams::question_source::QuestionSource;
use crate::screening::scoring::ResumeScorer;
use crate::screening::storage::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Uploaded resume documents. S3 in production.
    pub documents: Arc<dyn DocumentStore>,
    /// Default: KeywordResumeScorer.
    pub scorer: Arc<dyn ResumeScorer>,
    /// SkillBankSource, or LlmQuestionSource when ENABLE_LLM_QUESTIONS is set.
    pub questions: Arc<dyn QuestionSource>,
    pub attempts: AttemptService,
    pub config: Config,
}
