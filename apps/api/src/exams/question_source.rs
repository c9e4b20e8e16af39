//! Question sources: the generation backends behind the Exam Generator.
//!
//! Default: `SkillBankSource` (offline, deterministic templates over the role).
//! Optional: `LlmQuestionSource` (Claude via `LlmClient`), enabled by config.
//! Sources only draft; `exams::generator` validates, deduplicates and selects.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::exams::prompts::{QUESTION_GENERATION_SYSTEM, QUESTION_GENERATION_TEMPLATE};
use crate::llm_client::LlmClient;
use crate::models::exam::QuestionKind;
use crate::models::role::JobRole;

/// An unvalidated question as produced by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Label recorded with generated exams, for transparency.
    fn name(&self) -> &'static str;

    /// Returns up to (and possibly more than) `count` drafts for `role`.
    async fn drafts(&self, role: &JobRole, count: usize) -> Result<Vec<QuestionDraft>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// SkillBankSource
// ────────────────────────────────────────────────────────────────────────────

/// Offline source: a fixed bank of templates instantiated per required skill,
/// plus one open-ended question per requirement sentence. Same role in, same
/// drafts out, in the same order.
pub struct SkillBankSource;

const MIN_REQUIREMENT_LEN: usize = 8;

#[async_trait]
impl QuestionSource for SkillBankSource {
    fn name(&self) -> &'static str {
        "skill_bank"
    }

    async fn drafts(&self, role: &JobRole, _count: usize) -> Result<Vec<QuestionDraft>, AppError> {
        Ok(skill_bank(role))
    }
}

fn skill_bank(role: &JobRole) -> Vec<QuestionDraft> {
    let mut drafts = Vec::new();

    for skill in role.required_skills.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        drafts.push(multiple_choice(
            format!("When working with {skill}, which practice most improves long-term maintainability?"),
            [
                format!("Automated tests that cover the {skill} code paths"),
                format!("Copying working {skill} snippets between projects"),
                format!("Silencing {skill} warnings to keep builds green"),
                format!("Skipping code review for small {skill} changes"),
            ],
        ));
        drafts.push(multiple_choice(
            format!("A production issue involving {skill} is reported. What is the best first step?"),
            [
                format!("Reproduce it and inspect the {skill} logs and metrics"),
                format!("Ship an untested {skill} patch immediately"),
                "Wait to see whether it happens again".to_string(),
                format!("Rewrite the {skill} component from scratch"),
            ],
        ));
        drafts.push(multiple_choice(
            format!("How should a team evaluate a new {skill} library or feature before adopting it?"),
            [
                "Prototype it against real requirements and measure the result".to_string(),
                "Adopt it because it is popular".to_string(),
                "Reject anything the team has not used before".to_string(),
                "Leave the decision until after the release".to_string(),
            ],
        ));
        drafts.push(open_ended(format!(
            "Describe a project where you used {skill}. What problem did it solve and what would you do differently?"
        )));
        drafts.push(open_ended(format!(
            "Explain a common pitfall when working with {skill} and how you avoid it."
        )));
    }

    for requirement in role
        .requirements
        .split(['.', ';', '\n'])
        .map(str::trim)
        .filter(|r| r.len() >= MIN_REQUIREMENT_LEN)
    {
        drafts.push(open_ended(format!(
            "The {} role asks for: \"{requirement}\". Describe experience that shows you meet this.",
            role.title
        )));
    }

    drafts
}

/// The first option is the correct one; the generator shuffles option order.
fn multiple_choice(text: String, options: [String; 4]) -> QuestionDraft {
    QuestionDraft {
        text,
        kind: QuestionKind::MultipleChoice {
            correct_answer: options[0].clone(),
            options: options.to_vec(),
        },
    }
}

fn open_ended(text: String) -> QuestionDraft {
    QuestionDraft {
        text,
        kind: QuestionKind::OpenEnded {
            correct_answer: None,
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmQuestionSource
// ────────────────────────────────────────────────────────────────────────────

/// Drafts questions through the Claude Messages API.
pub struct LlmQuestionSource(pub LlmClient);

#[derive(Debug, Deserialize)]
struct DraftEnvelope {
    questions: Vec<QuestionDraft>,
}

#[async_trait]
impl QuestionSource for LlmQuestionSource {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn drafts(&self, role: &JobRole, count: usize) -> Result<Vec<QuestionDraft>, AppError> {
        let prompt = build_generation_prompt(role, count)?;
        let envelope: DraftEnvelope = self
            .0
            .call_json(&prompt, QUESTION_GENERATION_SYSTEM)
            .await
            .map_err(|e| AppError::GenerationFailure(format!("question backend failed: {e}")))?;
        info!(
            "LLM drafted {} questions for role {} ({} requested)",
            envelope.questions.len(),
            role.id,
            count
        );
        Ok(envelope.questions)
    }
}

fn build_generation_prompt(role: &JobRole, count: usize) -> Result<String, AppError> {
    let skills_json = serde_json::to_string(&role.required_skills)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize skills: {e}")))?;

    Ok(QUESTION_GENERATION_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{title}", &role.title)
        .replace("{description}", &role.description)
        .replace("{responsibilities}", &role.responsibilities)
        .replace("{requirements}", &role.requirements)
        .replace("{skills_json}", &skills_json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn role(skills: &[&str], requirements: &str) -> JobRole {
        JobRole {
            id: 5,
            owner_id: 1,
            title: "Backend Engineer".to_string(),
            description: "APIs".to_string(),
            responsibilities: "Run services".to_string(),
            requirements: requirements.to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            location: Some("Remote".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_skill_bank_size_follows_role() {
        let drafts = SkillBankSource
            .drafts(&role(&["Rust", "SQL"], "Ship reliable services. On-call rotation"), 10)
            .await
            .unwrap();
        assert_eq!(drafts.len(), 2 * 5 + 2);
    }

    #[tokio::test]
    async fn test_skill_bank_is_deterministic() {
        let r = role(&["Go"], "3+ years building APIs");
        let a = SkillBankSource.drafts(&r, 5).await.unwrap();
        let b = SkillBankSource.drafts(&r, 5).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_skill_bank_multiple_choice_keys_are_options() {
        let drafts = SkillBankSource.drafts(&role(&["Kafka"], ""), 5).await.unwrap();
        for draft in drafts {
            if let QuestionKind::MultipleChoice { options, correct_answer } = draft.kind {
                assert!(options.len() >= 2);
                assert!(options.contains(&correct_answer));
            }
        }
    }

    #[test]
    fn test_llm_draft_json_deserializes() {
        let envelope: DraftEnvelope = serde_json::from_str(
            r#"{"questions": [
                {"text": "Pick", "type": "multiple_choice", "options": ["a", "b"], "correct_answer": "b"},
                {"text": "Explain", "type": "open_ended", "correct_answer": null}
            ]}"#,
        )
        .unwrap();
        assert_eq!(envelope.questions.len(), 2);
        assert_eq!(
            envelope.questions[1].kind,
            QuestionKind::OpenEnded { correct_answer: None }
        );
    }

    #[test]
    fn test_generation_prompt_is_filled() {
        let prompt = build_generation_prompt(&role(&["Rust"], "Own the API"), 15).unwrap();
        assert!(prompt.contains("Write 15 distinct exam questions"));
        assert!(prompt.contains(r#"["Rust"]"#));
        assert!(!prompt.contains("{title}"));
    }
}
