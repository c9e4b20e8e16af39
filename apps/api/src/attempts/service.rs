//! Serialized attempt mutations.
//!
//! Every operation is load → pure transition (`attempts::machine`) →
//! conditional save. When another writer got there first the save comes back
//! stale and the transition is re-applied to the fresh state, which is how the
//! loser of two concurrent submits ends up with `InvalidTransition`.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::attempts::flags::FlagPolicy;
use crate::attempts::machine;
use crate::attempts::store::{AttemptStore, Assignment};
use crate::errors::AppError;
use crate::exams::grader::{GradeOutcome, OpenEndedPolicy};
use crate::models::attempt::{Answers, CandidateExam, ProctoringFlag};
use crate::models::exam::Exam;

const MAX_SAVE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct GradedAttempt {
    pub attempt: CandidateExam,
    pub outcome: GradeOutcome,
}

#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn AttemptStore>,
    flag_policy: FlagPolicy,
    open_ended: OpenEndedPolicy,
}

impl AttemptService {
    pub fn new(store: Arc<dyn AttemptStore>, flag_policy: FlagPolicy, open_ended: OpenEndedPolicy) -> Self {
        Self {
            store,
            flag_policy,
            open_ended,
        }
    }

    pub async fn get(&self, attempt_id: i64) -> Result<CandidateExam, AppError> {
        self.store.get(attempt_id).await
    }

    pub async fn exam_for(&self, attempt: &CandidateExam) -> Result<Exam, AppError> {
        self.store.exam(attempt.exam_id).await
    }

    pub async fn list_for_candidate(&self, candidate_id: i64) -> Result<Vec<CandidateExam>, AppError> {
        self.store.list_for_candidate(candidate_id).await
    }

    /// Idempotent per (candidate, exam): returns the live attempt if there is one.
    pub async fn assign(&self, candidate_id: i64, exam_id: i64) -> Result<Assignment, AppError> {
        self.store.exam(exam_id).await?;
        let assignment = self.store.assign(candidate_id, exam_id).await?;
        info!(
            "Candidate {candidate_id} assigned exam {exam_id} (attempt {}, {}, {})",
            assignment.attempt.id,
            assignment.attempt.status,
            if assignment.created { "new" } else { "existing" }
        );
        Ok(assignment)
    }

    pub async fn start(&self, attempt_id: i64) -> Result<CandidateExam, AppError> {
        let (attempt, ()) = self
            .transition(attempt_id, |a| machine::start(a, Utc::now()))
            .await?;
        info!("Attempt {attempt_id} started");
        Ok(attempt)
    }

    pub async fn record_flag(&self, attempt_id: i64, flag: ProctoringFlag) -> Result<CandidateExam, AppError> {
        let kind = flag.kind;
        let policy = self.flag_policy;
        let (attempt, ()) = self
            .transition(attempt_id, |a| machine::record_flag(a, flag.clone(), &policy))
            .await?;
        if attempt.flagged {
            warn!("Attempt {attempt_id} is flagged ({kind:?}, {} signals)", attempt.flags.len());
        }
        Ok(attempt)
    }

    pub async fn save_progress(&self, attempt_id: i64, answers: Answers) -> Result<CandidateExam, AppError> {
        let exam = self.exam_of(attempt_id).await?;
        let (attempt, ()) = self
            .transition(attempt_id, |a| machine::save_progress(a, &exam, answers.clone()))
            .await?;
        debug!("Attempt {attempt_id} saved {} answers", answers.len());
        Ok(attempt)
    }

    pub async fn submit_answers(&self, attempt_id: i64, answers: Answers) -> Result<GradedAttempt, AppError> {
        let exam = self.exam_of(attempt_id).await?;
        let policy = self.open_ended;
        let (attempt, outcome) = self
            .transition(attempt_id, |a| {
                machine::submit(a, &exam, answers.clone(), policy, Utc::now())
            })
            .await?;
        info!(
            "Attempt {attempt_id} submitted: score {} (pass mark {}, passed {})",
            outcome.score, exam.pass_mark, outcome.passed
        );
        Ok(GradedAttempt { attempt, outcome })
    }

    pub async fn expire(&self, attempt_id: i64) -> Result<GradedAttempt, AppError> {
        let exam = self.exam_of(attempt_id).await?;
        let policy = self.open_ended;
        let (attempt, outcome) = self
            .transition(attempt_id, |a| machine::expire(a, &exam, policy, Utc::now()))
            .await?;
        info!("Attempt {attempt_id} expired: score {}", outcome.score);
        Ok(GradedAttempt { attempt, outcome })
    }

    async fn exam_of(&self, attempt_id: i64) -> Result<Exam, AppError> {
        let attempt = self.store.get(attempt_id).await?;
        self.store.exam(attempt.exam_id).await
    }

    async fn transition<T, F>(&self, attempt_id: i64, mut apply: F) -> Result<(CandidateExam, T), AppError>
    where
        F: FnMut(&mut CandidateExam) -> Result<T, AppError> + Send,
        T: Send,
    {
        for round in 1..=MAX_SAVE_ATTEMPTS {
            let mut attempt = self.store.get(attempt_id).await?;
            let out = apply(&mut attempt)?;
            if let Some(saved) = self.store.save(&attempt).await? {
                return Ok((saved, out));
            }
            debug!("Attempt {attempt_id} changed concurrently, retrying ({round}/{MAX_SAVE_ATTEMPTS})");
        }
        Err(AppError::Internal(anyhow::anyhow!(
            "attempt {attempt_id} kept changing under concurrent writes"
        )))
    }
}
