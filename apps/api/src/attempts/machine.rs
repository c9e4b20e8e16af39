//! Exam session transitions: `pending → in_progress → completed`.
//!
//! Every function checks the current status before touching the attempt, so
//! an `Err` always leaves the attempt unchanged. Persistence and concurrency
//! live in `attempts::service`.

use chrono::{DateTime, Duration, Utc};

use crate::attempts::flags::FlagPolicy;
use crate::errors::AppError;
use crate::exams::grader::{grade, GradeOutcome, OpenEndedPolicy};
use crate::models::attempt::{Answers, AttemptStatus, CandidateExam, ProctoringFlag};
use crate::models::exam::Exam;

fn require(attempt: &CandidateExam, status: AttemptStatus, action: &'static str) -> Result<(), AppError> {
    if attempt.status == status {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            attempt_id: attempt.id,
            status: attempt.status,
            action,
        })
    }
}

pub fn start(attempt: &mut CandidateExam, now: DateTime<Utc>) -> Result<(), AppError> {
    require(attempt, AttemptStatus::Pending, "start")?;
    attempt.status = AttemptStatus::InProgress;
    attempt.started_at = Some(now);
    Ok(())
}

/// Appends a proctoring flag. Answers and score are never touched.
pub fn record_flag(
    attempt: &mut CandidateExam,
    flag: ProctoringFlag,
    policy: &FlagPolicy,
) -> Result<(), AppError> {
    require(attempt, AttemptStatus::InProgress, "record a flag on")?;
    attempt.flags.push(flag);
    attempt.flagged = attempt.flagged || policy.should_flag(&attempt.flags);
    Ok(())
}

/// Replaces the working answer set of an in-progress attempt.
pub fn save_progress(attempt: &mut CandidateExam, exam: &Exam, answers: Answers) -> Result<(), AppError> {
    require(attempt, AttemptStatus::InProgress, "save answers for")?;
    check_answer_keys(exam, &answers)?;
    attempt.answers = Some(answers);
    Ok(())
}

pub fn submit(
    attempt: &mut CandidateExam,
    exam: &Exam,
    answers: Answers,
    policy: OpenEndedPolicy,
    now: DateTime<Utc>,
) -> Result<GradeOutcome, AppError> {
    require(attempt, AttemptStatus::InProgress, "submit")?;
    check_answer_keys(exam, &answers)?;
    Ok(complete(attempt, exam, answers, policy, now))
}

/// Closes an attempt whose time limit has run out, grading whatever answers
/// were saved so far.
pub fn expire(
    attempt: &mut CandidateExam,
    exam: &Exam,
    policy: OpenEndedPolicy,
    now: DateTime<Utc>,
) -> Result<GradeOutcome, AppError> {
    require(attempt, AttemptStatus::InProgress, "expire")?;
    let deadline = attempt
        .started_at
        .map(|started| started + Duration::minutes(i64::from(exam.time_limit_minutes)));
    if !deadline.is_some_and(|d| now >= d) {
        return Err(AppError::InvalidTransition {
            attempt_id: attempt.id,
            status: attempt.status,
            action: "expire (time limit not reached)",
        });
    }
    let answers = attempt.answers.clone().unwrap_or_default();
    Ok(complete(attempt, exam, answers, policy, now))
}

fn complete(
    attempt: &mut CandidateExam,
    exam: &Exam,
    answers: Answers,
    policy: OpenEndedPolicy,
    now: DateTime<Utc>,
) -> GradeOutcome {
    let outcome = grade(exam, &answers, policy);
    attempt.answers = Some(answers);
    attempt.status = AttemptStatus::Completed;
    attempt.completed_at = Some(now);
    attempt.score = Some(outcome.score);
    attempt.passed = Some(outcome.passed);
    outcome
}

fn check_answer_keys(exam: &Exam, answers: &Answers) -> Result<(), AppError> {
    match answers
        .keys()
        .find(|id| !exam.questions.iter().any(|q| &q.id == *id))
    {
        Some(unknown) => Err(AppError::Validation(format!(
            "exam {} has no question '{unknown}'",
            exam.id
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::FlagKind;
    use crate::models::exam::{Question, QuestionKind};

    fn exam() -> Exam {
        Exam {
            id: 3,
            owner_id: 1,
            job_role_id: 2,
            questions: vec![
                Question {
                    id: "q1".to_string(),
                    text: "Pick".to_string(),
                    kind: QuestionKind::MultipleChoice {
                        options: vec!["a".to_string(), "b".to_string()],
                        correct_answer: "a".to_string(),
                    },
                },
                Question {
                    id: "q2".to_string(),
                    text: "Pick again".to_string(),
                    kind: QuestionKind::MultipleChoice {
                        options: vec!["a".to_string(), "b".to_string()],
                        correct_answer: "b".to_string(),
                    },
                },
            ],
            pass_mark: 50,
            time_limit_minutes: 30,
            created_at: Utc::now(),
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> Answers {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn flag(kind: FlagKind) -> ProctoringFlag {
        ProctoringFlag {
            at: Utc::now(),
            kind,
            detail: None,
        }
    }

    fn started() -> CandidateExam {
        let mut a = CandidateExam::new_pending(1, 7, 3);
        start(&mut a, Utc::now()).unwrap();
        a
    }

    #[test]
    fn test_happy_path_visits_states_in_order() {
        let mut a = CandidateExam::new_pending(1, 7, 3);
        let mut seen = vec![a.status];
        let now = Utc::now();
        start(&mut a, now).unwrap();
        seen.push(a.status);
        assert_eq!(a.started_at, Some(now));

        let outcome = submit(&mut a, &exam(), answers(&[("q1", "a"), ("q2", "b")]), OpenEndedPolicy::ManualReview, now).unwrap();
        seen.push(a.status);
        assert_eq!(
            seen,
            vec![AttemptStatus::Pending, AttemptStatus::InProgress, AttemptStatus::Completed]
        );
        assert_eq!(outcome.score, 100);
        assert_eq!(a.score, Some(100));
        assert_eq!(a.passed, Some(true));
        assert_eq!(a.completed_at, Some(now));
    }

    #[test]
    fn test_double_start_is_invalid() {
        let mut a = started();
        let before = a.clone();
        let err = start(&mut a, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { status: AttemptStatus::InProgress, .. }));
        assert_eq!(a, before);
    }

    #[test]
    fn test_submit_before_start_is_invalid() {
        let mut a = CandidateExam::new_pending(1, 7, 3);
        let err = submit(&mut a, &exam(), Answers::new(), OpenEndedPolicy::ManualReview, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { status: AttemptStatus::Pending, .. }));
        assert_eq!(a.status, AttemptStatus::Pending);
        assert!(a.answers.is_none());
    }

    #[test]
    fn test_flag_on_completed_is_invalid_and_leaves_flags() {
        let mut a = started();
        record_flag(&mut a, flag(FlagKind::TabSwitch), &FlagPolicy::default()).unwrap();
        submit(&mut a, &exam(), Answers::new(), OpenEndedPolicy::ManualReview, Utc::now()).unwrap();

        let err = record_flag(&mut a, flag(FlagKind::NoFace), &FlagPolicy::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { status: AttemptStatus::Completed, .. }));
        assert_eq!(a.flags.len(), 1);
    }

    #[test]
    fn test_flags_do_not_touch_answers_or_score() {
        let mut a = started();
        save_progress(&mut a, &exam(), answers(&[("q1", "a")])).unwrap();
        for _ in 0..3 {
            record_flag(&mut a, flag(FlagKind::LookingAway), &FlagPolicy::default()).unwrap();
        }
        assert!(a.flagged);
        assert_eq!(a.answers, Some(answers(&[("q1", "a")])));
        assert_eq!(a.score, None);
        assert_eq!(a.status, AttemptStatus::InProgress);
    }

    #[test]
    fn test_unknown_question_id_is_rejected() {
        let mut a = started();
        let err = submit(&mut a, &exam(), answers(&[("q9", "a")]), OpenEndedPolicy::ManualReview, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(a.status, AttemptStatus::InProgress);
    }

    #[test]
    fn test_expire_before_limit_is_invalid() {
        let mut a = started();
        let err = expire(&mut a, &exam(), OpenEndedPolicy::ManualReview, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(a.status, AttemptStatus::InProgress);
    }

    #[test]
    fn test_expire_grades_saved_answers() {
        let start_at = Utc::now() - Duration::minutes(31);
        let mut a = CandidateExam::new_pending(1, 7, 3);
        start(&mut a, start_at).unwrap();
        save_progress(&mut a, &exam(), answers(&[("q1", "a")])).unwrap();

        let outcome = expire(&mut a, &exam(), OpenEndedPolicy::ManualReview, Utc::now()).unwrap();
        assert_eq!(outcome.score, 50);
        assert_eq!(a.status, AttemptStatus::Completed);
        assert_eq!(a.passed, Some(true));
    }
}
