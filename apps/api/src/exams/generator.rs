//! Exam Generator: turns question drafts into a validated, exactly-sized exam.
//!
//! Flow: validate params → request drafts (bounded by a timeout, a few rounds)
//!       → normalize + check invariants → dedupe → seeded shuffle → take N →
//!       assign ids → final validation.
//!
//! Nothing here touches the database; a failed generation leaves no row behind.

use std::collections::HashSet;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::exams::question_source::{QuestionDraft, QuestionSource};
use crate::models::exam::{Question, QuestionKind};
use crate::models::role::JobRole;

/// Draft requests made before giving up on reaching the requested count.
const MAX_GENERATION_ROUNDS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamParams {
    pub question_count: usize,
    pub pass_mark: u8,
    pub time_limit_minutes: u32,
    /// Fixes question selection and option order. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// A validated exam that has not been persisted yet.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedExam {
    pub job_role_id: i64,
    pub questions: Vec<Question>,
    pub pass_mark: u8,
    pub time_limit_minutes: u32,
    pub source: &'static str,
}

/// Generates an exam with exactly `params.question_count` questions.
pub async fn generate_exam(
    source: &dyn QuestionSource,
    role: &JobRole,
    params: &ExamParams,
    backend_timeout: Duration,
) -> Result<GeneratedExam, AppError> {
    validate_params(params)?;
    let wanted = params.question_count;

    let mut pool: Vec<QuestionDraft> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for round in 1..=MAX_GENERATION_ROUNDS {
        let missing = wanted - pool.len();
        let drafts = tokio::time::timeout(backend_timeout, source.drafts(role, missing))
            .await
            .map_err(|_| {
                AppError::GenerationFailure(format!(
                    "question source '{}' timed out after {}s",
                    source.name(),
                    backend_timeout.as_secs()
                ))
            })??;

        let before = pool.len();
        for draft in drafts {
            let draft = normalize_draft(draft)?;
            if seen.insert(draft.text.to_lowercase()) {
                pool.push(draft);
            }
        }

        if pool.len() >= wanted {
            break;
        }
        if pool.len() == before {
            // A source that adds nothing new will not do better on another round.
            break;
        }
        warn!(
            "Generation round {round}/{MAX_GENERATION_ROUNDS}: {} of {wanted} distinct questions from '{}'",
            pool.len(),
            source.name()
        );
    }

    if pool.len() < wanted {
        return Err(AppError::GenerationFailure(format!(
            "question source '{}' produced {} distinct questions for role {}, {} requested",
            source.name(),
            pool.len(),
            role.id,
            wanted
        )));
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    pool.shuffle(&mut rng);
    pool.truncate(wanted);

    let questions: Vec<Question> = pool
        .into_iter()
        .enumerate()
        .map(|(i, draft)| {
            let kind = match draft.kind {
                QuestionKind::MultipleChoice {
                    mut options,
                    correct_answer,
                } => {
                    options.shuffle(&mut rng);
                    QuestionKind::MultipleChoice {
                        options,
                        correct_answer,
                    }
                }
                open => open,
            };
            Question {
                id: format!("q{}", i + 1),
                text: draft.text,
                kind,
            }
        })
        .collect();

    validate_questions(&questions, wanted)?;

    info!(
        "Generated {} questions for role {} via '{}' (pass mark {}%)",
        questions.len(),
        role.id,
        source.name(),
        params.pass_mark
    );

    Ok(GeneratedExam {
        job_role_id: role.id,
        questions,
        pass_mark: params.pass_mark,
        time_limit_minutes: params.time_limit_minutes,
        source: source.name(),
    })
}

fn validate_params(params: &ExamParams) -> Result<(), AppError> {
    if params.question_count == 0 {
        return Err(AppError::Validation(
            "question_count must be a positive integer".to_string(),
        ));
    }
    if params.pass_mark > 100 {
        return Err(AppError::Validation(
            "pass_mark must be between 0 and 100".to_string(),
        ));
    }
    if params.time_limit_minutes == 0 {
        return Err(AppError::Validation(
            "time_limit_minutes must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Trims a draft and enforces the multiple-choice invariant: at least two
/// distinct options, and the key is one of them.
fn normalize_draft(draft: QuestionDraft) -> Result<QuestionDraft, AppError> {
    let text = draft.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::InvariantViolation(
            "question draft has empty text".to_string(),
        ));
    }

    let kind = match draft.kind {
        QuestionKind::MultipleChoice {
            options,
            correct_answer,
        } => {
            let mut distinct: Vec<String> = Vec::with_capacity(options.len());
            for option in options.iter().map(|o| o.trim()).filter(|o| !o.is_empty()) {
                if !distinct.iter().any(|d| d == option) {
                    distinct.push(option.to_string());
                }
            }
            let correct_answer = correct_answer.trim().to_string();
            check_multiple_choice(&text, &distinct, &correct_answer)?;
            QuestionKind::MultipleChoice {
                options: distinct,
                correct_answer,
            }
        }
        QuestionKind::OpenEnded { correct_answer } => QuestionKind::OpenEnded {
            correct_answer: correct_answer
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        },
    };

    Ok(QuestionDraft { text, kind })
}

fn check_multiple_choice(text: &str, options: &[String], correct: &str) -> Result<(), AppError> {
    if options.len() < 2 {
        return Err(AppError::InvariantViolation(format!(
            "multiple-choice question \"{text}\" has {} distinct options, at least 2 required",
            options.len()
        )));
    }
    if !options.iter().any(|o| o == correct) {
        return Err(AppError::InvariantViolation(format!(
            "multiple-choice question \"{text}\" has correct answer \"{correct}\" outside its options"
        )));
    }
    Ok(())
}

/// Checks a finished question set before it may be persisted.
pub fn validate_questions(questions: &[Question], expected: usize) -> Result<(), AppError> {
    if questions.len() != expected {
        return Err(AppError::InvariantViolation(format!(
            "exam has {} questions, {expected} expected",
            questions.len()
        )));
    }
    let mut ids = HashSet::new();
    for question in questions {
        if !ids.insert(question.id.as_str()) {
            return Err(AppError::InvariantViolation(format!(
                "duplicate question id {}",
                question.id
            )));
        }
        if question.text.trim().is_empty() {
            return Err(AppError::InvariantViolation(format!(
                "question {} has empty text",
                question.id
            )));
        }
        if let QuestionKind::MultipleChoice {
            options,
            correct_answer,
        } = &question.kind
        {
            check_multiple_choice(&question.text, options, correct_answer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exams::question_source::SkillBankSource;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn role(skills: &[&str]) -> JobRole {
        JobRole {
            id: 2,
            owner_id: 1,
            title: "Platform Engineer".to_string(),
            description: "Infra".to_string(),
            responsibilities: "Keep clusters healthy".to_string(),
            requirements: "Five years of operations experience. Comfortable on call".to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            location: None,
            created_at: Utc::now(),
        }
    }

    fn params(n: usize, seed: Option<u64>) -> ExamParams {
        ExamParams {
            question_count: n,
            pass_mark: 70,
            time_limit_minutes: 30,
            seed,
        }
    }

    /// Returns a fixed list of drafts on every call.
    struct FixedSource(Vec<QuestionDraft>);

    #[async_trait]
    impl QuestionSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn drafts(&self, _role: &JobRole, _count: usize) -> Result<Vec<QuestionDraft>, AppError> {
            Ok(self.0.clone())
        }
    }

    /// Returns one new draft per call.
    struct TrickleSource(AtomicU32);

    #[async_trait]
    impl QuestionSource for TrickleSource {
        fn name(&self) -> &'static str {
            "trickle"
        }

        async fn drafts(&self, _role: &JobRole, _count: usize) -> Result<Vec<QuestionDraft>, AppError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![open(&format!("Open question number {n}"))])
        }
    }

    struct StalledSource;

    #[async_trait]
    impl QuestionSource for StalledSource {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn drafts(&self, _role: &JobRole, _count: usize) -> Result<Vec<QuestionDraft>, AppError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    fn mc(text: &str, options: &[&str], correct: &str) -> QuestionDraft {
        QuestionDraft {
            text: text.to_string(),
            kind: QuestionKind::MultipleChoice {
                options: options.iter().map(|o| o.to_string()).collect(),
                correct_answer: correct.to_string(),
            },
        }
    }

    fn open(text: &str) -> QuestionDraft {
        QuestionDraft {
            text: text.to_string(),
            kind: QuestionKind::OpenEnded {
                correct_answer: None,
            },
        }
    }

    #[tokio::test]
    async fn test_returns_exactly_n_questions() {
        let r = role(&["Kubernetes", "Terraform", "Go"]);
        for n in [1, 10, 15] {
            let exam = generate_exam(&SkillBankSource, &r, &params(n, Some(1)), TIMEOUT)
                .await
                .unwrap();
            assert_eq!(exam.questions.len(), n);
        }
    }

    #[tokio::test]
    async fn test_question_ids_are_unique_and_sequential() {
        let exam = generate_exam(&SkillBankSource, &role(&["Go", "Rust"]), &params(10, Some(3)), TIMEOUT)
            .await
            .unwrap();
        let ids: Vec<&str> = exam.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"q1"));
        assert_eq!(ids.last(), Some(&"q10"));
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 10);
    }

    #[tokio::test]
    async fn test_same_seed_same_exam() {
        let r = role(&["Kubernetes", "Terraform", "Go"]);
        let a = generate_exam(&SkillBankSource, &r, &params(10, Some(42)), TIMEOUT).await.unwrap();
        let b = generate_exam(&SkillBankSource, &r, &params(10, Some(42)), TIMEOUT).await.unwrap();
        assert_eq!(a.questions, b.questions);
    }

    #[tokio::test]
    async fn test_insufficient_source_is_generation_failure() {
        // 2 skills * 5 templates + 2 requirement sentences = 12 < 30
        let err = generate_exam(&SkillBankSource, &role(&["Go", "Rust"]), &params(30, Some(1)), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationFailure(_)));
    }

    #[tokio::test]
    async fn test_duplicates_do_not_count_towards_n() {
        let source = FixedSource(vec![
            open("Explain retries"),
            open("  explain RETRIES "),
            open("Explain backoff"),
        ]);
        let err = generate_exam(&source, &role(&[]), &params(3, None), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationFailure(msg) if msg.contains("produced 2")));
    }

    #[tokio::test]
    async fn test_keeps_requesting_while_source_makes_progress() {
        let source = TrickleSource(AtomicU32::new(0));
        let exam = generate_exam(&source, &role(&[]), &params(3, Some(9)), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(exam.questions.len(), 3);
    }

    #[tokio::test]
    async fn test_multiple_choice_with_foreign_key_is_invariant_violation() {
        let source = FixedSource(vec![mc("Pick one", &["a", "b"], "c")]);
        let err = generate_exam(&source, &role(&[]), &params(1, None), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_multiple_choice_with_one_distinct_option_is_invariant_violation() {
        let source = FixedSource(vec![mc("Pick one", &["a", " a ", ""], "a")]);
        let err = generate_exam(&source, &role(&[]), &params(1, None), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_options_are_trimmed_before_key_check() {
        let source = FixedSource(vec![mc(" Pick one ", &[" a", "b "], "b")]);
        let exam = generate_exam(&source, &role(&[]), &params(1, Some(5)), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(exam.questions[0].text, "Pick one");
        match &exam.questions[0].kind {
            QuestionKind::MultipleChoice { options, correct_answer } => {
                assert!(options.contains(correct_answer));
                assert_eq!(options.len(), 2);
            }
            other => panic!("expected multiple choice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_questions_is_rejected() {
        let err = generate_exam(&SkillBankSource, &role(&["Go"]), &params(0, None), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_source_times_out_as_generation_failure() {
        let err = generate_exam(&StalledSource, &role(&["Go"]), &params(1, None), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationFailure(msg) if msg.contains("timed out")));
    }

    #[test]
    fn test_validate_questions_rejects_wrong_count_and_duplicate_ids() {
        let q = Question {
            id: "q1".to_string(),
            text: "Explain".to_string(),
            kind: QuestionKind::OpenEnded { correct_answer: None },
        };
        assert!(validate_questions(&[q.clone()], 2).is_err());
        assert!(validate_questions(&[q.clone(), q], 2).is_err());
    }
}
