//! Resume Scorer: measures a parsed resume against a job role.
//!
//! Default: `KeywordResumeScorer` (pure-Rust, deterministic, fully testable).
//! `AppState` holds an `Arc<dyn ResumeScorer>` so the backend can be swapped
//! without touching handlers.

use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::resume::ParsedResume;
use crate::models::role::JobRole;

/// Skill coverage weight when the role also states an experience requirement.
const SKILL_WEIGHT: f64 = 0.8;
const EXPERIENCE_WEIGHT: f64 = 0.2;

pub const PARSE_DATA_UNAVAILABLE: &str = "parse data unavailable";
pub const NOTHING_TO_SCORE: &str = "role declares no scoreable requirements";

static YEARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*(?:years?|yrs?)\b").expect("valid years regex")
});

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b((?:19|20)\d{2})\s*(?:-|–|—|to)\s*((?:19|20)\d{2}|present|current|now)\b")
        .expect("valid year range regex")
});

/// Score in `0..=100` plus reasons ordered by the role's skill declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: u8,
    pub reasons: Vec<String>,
    pub matched_skills: usize,
    pub required_skills: usize,
    pub scorer_backend: String,
}

impl ScoreReport {
    fn unscored(reason: &str) -> Self {
        Self {
            score: 0,
            reasons: vec![reason.to_string()],
            matched_skills: 0,
            required_skills: 0,
            scorer_backend: "keyword".to_string(),
        }
    }
}

pub trait ResumeScorer: Send + Sync {
    /// Never fails: missing parse data scores 0.
    fn score(&self, parsed: Option<&ParsedResume>, role: &JobRole) -> ScoreReport;
}

/// Keyword scorer.
///
/// Algorithm:
/// 1. skill = matched required skills / total required skills
/// 2. experience = min(candidate years / required years, 1) when the
///    requirements text demands "N years"
/// 3. score = 0.8 * skill + 0.2 * experience, or whichever component exists
pub struct KeywordResumeScorer;

impl ResumeScorer for KeywordResumeScorer {
    fn score(&self, parsed: Option<&ParsedResume>, role: &JobRole) -> ScoreReport {
        match parsed {
            Some(parsed) => compute_keyword_score(parsed, role),
            None => ScoreReport::unscored(PARSE_DATA_UNAVAILABLE),
        }
    }
}

fn compute_keyword_score(parsed: &ParsedResume, role: &JobRole) -> ScoreReport {
    let mut reasons = Vec::with_capacity(role.required_skills.len() + 1);
    let mut matched = 0usize;

    for required in &role.required_skills {
        if parsed.skills.iter().any(|s| skill_matches(s, required)) {
            matched += 1;
            reasons.push(format!("matched skill: {required}"));
        } else {
            reasons.push(format!("missing skill: {required}"));
        }
    }

    let total = role.required_skills.len();
    let skill_ratio = (total > 0).then(|| matched as f64 / total as f64);

    let experience_ratio = required_years(&role.requirements).map(|required| {
        let candidate = candidate_years(&parsed.experience, Utc::now().year());
        reasons.push(format!(
            "{candidate} yrs experience vs. required {required}"
        ));
        (candidate as f64 / required as f64).min(1.0)
    });

    let combined = match (skill_ratio, experience_ratio) {
        (Some(s), Some(e)) => SKILL_WEIGHT * s + EXPERIENCE_WEIGHT * e,
        (Some(s), None) => s,
        (None, Some(e)) => e,
        (None, None) => return ScoreReport::unscored(NOTHING_TO_SCORE),
    };

    ScoreReport {
        score: (combined * 100.0).round().clamp(0.0, 100.0) as u8,
        reasons,
        matched_skills: matched,
        required_skills: total,
        scorer_backend: "keyword".to_string(),
    }
}

/// Case-insensitive match of a whole skill, also inside a longer resume entry
/// ("Python 3" covers "Python", "JavaScript" does not cover "Java").
fn skill_matches(candidate: &str, required: &str) -> bool {
    let have = tokenize(candidate);
    let want = tokenize(required);
    if want.is_empty() || have.len() < want.len() {
        return false;
    }
    have.windows(want.len()).any(|w| w == want.as_slice())
}

fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| c.is_whitespace() || matches!(c, ',' | '/' | '(' | ')' | ':'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Largest "N years" demand in the requirements text. Zero counts as none.
fn required_years(requirements: &str) -> Option<u32> {
    YEARS_RE
        .captures_iter(requirements)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .filter(|y| *y > 0)
}

/// Best estimate of the candidate's years of experience: the larger of any
/// explicit "N years" mention and the sum of dated ranges.
fn candidate_years(experience: &[String], current_year: i32) -> u32 {
    let mut explicit = 0u32;
    let mut ranged = 0u32;
    for line in experience {
        if let Some(y) = YEARS_RE
            .captures_iter(line)
            .filter_map(|c| c[1].parse::<u32>().ok())
            .max()
        {
            explicit = explicit.max(y);
        }
        for c in RANGE_RE.captures_iter(line) {
            let Ok(start) = c[1].parse::<i32>() else {
                continue;
            };
            let end = c[2].parse::<i32>().unwrap_or(current_year);
            if end >= start {
                ranged += (end - start) as u32;
            }
        }
    }
    explicit.max(ranged)
}
