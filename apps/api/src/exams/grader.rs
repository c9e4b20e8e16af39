//! Exam Grader: scores a completed answer set against the exam's keys.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::attempt::Answers;
use crate::models::exam::{Exam, QuestionKind};

/// How open-ended questions take part in automatic grading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenEndedPolicy {
    /// Excluded from the automatic score; left for a human reviewer.
    #[default]
    ManualReview,
    /// Auto-graded when a key exists: every key word must appear in the answer.
    KeywordHeuristic,
}

impl std::str::FromStr for OpenEndedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" | "manual_review" => Ok(OpenEndedPolicy::ManualReview),
            "keyword" | "keyword_heuristic" => Ok(OpenEndedPolicy::KeywordHeuristic),
            other => Err(format!("unknown open-ended grading policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeOutcome {
    pub score: u8,
    pub passed: bool,
    pub correct: usize,
    /// Questions that counted towards the score.
    pub gradable: usize,
    /// Open-ended questions waiting on manual review.
    pub pending_review: usize,
}

/// Grades `answers` against `exam`. A missing answer is simply wrong.
///
/// `score = round(100 * correct / gradable)`, 0 when nothing is gradable.
/// Only a fully correct answer set scores 100; anything less is capped at 99.
pub fn grade(exam: &Exam, answers: &Answers, policy: OpenEndedPolicy) -> GradeOutcome {
    let mut correct = 0usize;
    let mut gradable = 0usize;
    let mut pending_review = 0usize;

    for question in &exam.questions {
        let answer = answers.get(&question.id).map(|a| a.trim());
        match &question.kind {
            QuestionKind::MultipleChoice { correct_answer, .. } => {
                gradable += 1;
                if answer == Some(correct_answer.trim()) {
                    correct += 1;
                }
            }
            QuestionKind::OpenEnded { correct_answer } => {
                let key = correct_answer.as_deref().filter(|k| !k.trim().is_empty());
                match (policy, key) {
                    (OpenEndedPolicy::KeywordHeuristic, Some(key)) => {
                        gradable += 1;
                        if answer.is_some_and(|a| covers_key(a, key)) {
                            correct += 1;
                        }
                    }
                    _ => pending_review += 1,
                }
            }
        }
    }

    let score = if gradable == 0 {
        0
    } else if correct == gradable {
        100
    } else {
        ((correct as f64 / gradable as f64) * 100.0).round().min(99.0) as u8
    };

    GradeOutcome {
        score,
        passed: score >= exam.pass_mark,
        correct,
        gradable,
        pending_review,
    }
}

fn covers_key(answer: &str, key: &str) -> bool {
    let have = words(answer);
    let want = words(key);
    !want.is_empty() && want.is_subset(&have)
}

fn words(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exam::Question;
    use chrono::Utc;

    fn mc(id: &str, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("question {id}"),
            kind: QuestionKind::MultipleChoice {
                options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
                correct_answer: correct.to_string(),
            },
        }
    }

    fn open(id: &str, key: Option<&str>) -> Question {
        Question {
            id: id.to_string(),
            text: format!("explain {id}"),
            kind: QuestionKind::OpenEnded {
                correct_answer: key.map(str::to_string),
            },
        }
    }

    fn exam(questions: Vec<Question>, pass_mark: u8) -> Exam {
        Exam {
            id: 3,
            owner_id: 1,
            job_role_id: 2,
            questions,
            pass_mark,
            time_limit_minutes: 30,
            created_at: Utc::now(),
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect()
    }

    #[test]
    fn test_all_correct_scores_100_and_passes() {
        let e = exam(vec![mc("q1", "A"), mc("q2", "C"), mc("q3", "B")], 100);
        let outcome = grade(&e, &answers(&[("q1", "A"), ("q2", "C"), ("q3", "B")]), OpenEndedPolicy::ManualReview);
        assert_eq!(outcome.score, 100);
        assert!(outcome.passed);
    }

    #[test]
    fn test_all_wrong_scores_zero() {
        let e = exam(vec![mc("q1", "A"), mc("q2", "C")], 50);
        let outcome = grade(&e, &answers(&[("q1", "B"), ("q2", "A")]), OpenEndedPolicy::ManualReview);
        assert_eq!(outcome.score, 0);
        assert!(!outcome.passed);
    }

    #[test]
    fn test_missing_answers_count_as_incorrect() {
        let e = exam(vec![mc("q1", "A"), mc("q2", "C"), mc("q3", "B")], 60);
        let outcome = grade(&e, &answers(&[("q1", " A ")]), OpenEndedPolicy::ManualReview);
        assert_eq!(outcome.correct, 1);
        assert_eq!(outcome.score, 33);
        assert!(!outcome.passed);
    }

    #[test]
    fn test_pass_mark_is_inclusive() {
        let e = exam(vec![mc("q1", "A"), mc("q2", "B")], 50);
        let outcome = grade(&e, &answers(&[("q1", "A")]), OpenEndedPolicy::ManualReview);
        assert_eq!(outcome.score, 50);
        assert!(outcome.passed);
    }

    #[test]
    fn test_one_miss_never_rounds_up_to_100() {
        let questions: Vec<Question> = (1..=200).map(|i| mc(&format!("q{i}"), "A")).collect();
        let e = exam(questions, 100);
        let mostly: Answers = (2..=200).map(|i| (format!("q{i}"), "A".to_string())).collect();
        let outcome = grade(&e, &mostly, OpenEndedPolicy::ManualReview);
        assert_eq!(outcome.correct, 199);
        assert_eq!(outcome.score, 99);
        assert!(!outcome.passed);
    }

    #[test]
    fn test_open_ended_excluded_under_manual_review() {
        let e = exam(vec![mc("q1", "A"), open("q2", Some("ownership borrowing"))], 70);
        let outcome = grade(&e, &answers(&[("q1", "A")]), OpenEndedPolicy::ManualReview);
        assert_eq!(outcome.gradable, 1);
        assert_eq!(outcome.pending_review, 1);
        assert_eq!(outcome.score, 100);
    }

    #[test]
    fn test_keyword_heuristic_requires_every_key_word() {
        let e = exam(vec![open("q1", Some("Ownership, borrowing")), open("q2", Some("lifetimes"))], 50);
        let outcome = grade(
            &e,
            &answers(&[
                ("q1", "Rust tracks borrowing and ownership at compile time"),
                ("q2", "no idea"),
            ]),
            OpenEndedPolicy::KeywordHeuristic,
        );
        assert_eq!(outcome.correct, 1);
        assert_eq!(outcome.score, 50);
    }

    #[test]
    fn test_keyless_open_ended_stays_manual_under_heuristic() {
        let e = exam(vec![open("q1", None)], 50);
        let outcome = grade(&e, &answers(&[("q1", "anything")]), OpenEndedPolicy::KeywordHeuristic);
        assert_eq!(outcome.gradable, 0);
        assert_eq!(outcome.score, 0);
        assert!(!outcome.passed);
    }

    #[test]
    fn test_policy_parses_from_config_values() {
        assert_eq!("manual".parse::<OpenEndedPolicy>().unwrap(), OpenEndedPolicy::ManualReview);
        assert_eq!("keyword".parse::<OpenEndedPolicy>().unwrap(), OpenEndedPolicy::KeywordHeuristic);
        assert!("llm".parse::<OpenEndedPolicy>().is_err());
    }
}
