//! Resume Parser: turns a resume document into a `ParsedResume`.
//!
//! Extraction is best-effort: a field the document does not carry stays empty.
//! Only an unreadable document is an error, and nothing is ever inferred.

use std::collections::HashSet;
use std::sync::LazyLock;

use bytes::Bytes;
use regex::Regex;
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::{FileType, ParsedResume};
use crate::screening::extract::extract_text;
use crate::screening::storage::DocumentStore;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{6,}\d").expect("valid phone regex"));

const MIN_PHONE_DIGITS: usize = 9;
const MAX_PHONE_DIGITS: usize = 15;

/// Words that mark a header line as a document title or job title, never a name.
const NOT_NAME_WORDS: &[&str] = &[
    "curriculum",
    "vitae",
    "resume",
    "résumé",
    "cv",
    "profile",
    "summary",
    "objective",
    "contact",
    "engineer",
    "developer",
    "manager",
    "architect",
    "analyst",
    "consultant",
    "designer",
    "scientist",
    "senior",
    "junior",
    "lead",
    "principal",
    "staff",
    "software",
    "backend",
    "frontend",
    "full-stack",
    "fullstack",
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Header,
    Experience,
    Education,
    Skills,
    Other,
}

const EXPERIENCE_HEADINGS: &[&str] = &[
    "experience",
    "work experience",
    "professional experience",
    "employment",
    "employment history",
    "work history",
];

const EDUCATION_HEADINGS: &[&str] = &[
    "education",
    "academic background",
    "education and training",
    "qualifications",
];

const SKILLS_HEADINGS: &[&str] = &[
    "skills",
    "technical skills",
    "core skills",
    "key skills",
    "technologies",
    "tech stack",
    "competencies",
];

const OTHER_HEADINGS: &[&str] = &[
    "summary",
    "profile",
    "objective",
    "about me",
    "projects",
    "certifications",
    "awards",
    "languages",
    "interests",
    "hobbies",
    "references",
    "publications",
    "contact",
];

/// Fetches a stored resume and parses it.
pub async fn parse_stored_resume(
    store: &dyn DocumentStore,
    file_ref: &str,
    file_type: FileType,
) -> Result<ParsedResume, AppError> {
    let bytes = store.get(file_ref).await?;
    parse_resume(file_ref, bytes, file_type).await
}

/// Parses raw resume bytes of the declared type.
pub async fn parse_resume(
    file_ref: &str,
    bytes: Bytes,
    file_type: FileType,
) -> Result<ParsedResume, AppError> {
    let text = extract_text(file_ref, bytes, file_type).await?;
    let parsed = extract_fields(&text);
    info!(
        "Parsed resume {file_ref}: {} skills, {} experience, {} education lines",
        parsed.skills.len(),
        parsed.experience.len(),
        parsed.education.len()
    );
    Ok(parsed)
}

/// Splits resume text into sections and pulls out the structured fields.
pub fn extract_fields(text: &str) -> ParsedResume {
    let mut parsed = ParsedResume::default();
    let mut section = Section::Header;
    let mut seen_skills = HashSet::new();

    for raw_line in text.lines() {
        let line = strip_bullet(raw_line);
        if line.is_empty() {
            continue;
        }

        if let Some((heading, rest)) = match_heading(line) {
            section = heading;
            if !rest.is_empty() {
                absorb_line(&mut parsed, section, rest, &mut seen_skills);
            }
            continue;
        }

        if parsed.email.is_none() {
            parsed.email = EMAIL_RE.find(line).map(|m| m.as_str().to_string());
        }
        if parsed.location.is_none() {
            parsed.location = labelled_value(line, &["location", "address", "based in"]);
        }
        if parsed.phone.is_none() && !matches!(section, Section::Experience | Section::Education) {
            parsed.phone = find_phone(line);
        }
        if section == Section::Header && parsed.name.is_none() && looks_like_name(line) {
            parsed.name = Some(line.to_string());
            continue;
        }

        absorb_line(&mut parsed, section, line, &mut seen_skills);
    }

    parsed
}

fn absorb_line(
    parsed: &mut ParsedResume,
    section: Section,
    line: &str,
    seen_skills: &mut HashSet<String>,
) {
    match section {
        Section::Experience => parsed.experience.push(line.to_string()),
        Section::Education => parsed.education.push(line.to_string()),
        Section::Skills => {
            for skill in line.split([',', ';', '|', '•', '·']) {
                let skill = skill.trim().trim_end_matches('.');
                if skill.is_empty() {
                    continue;
                }
                if seen_skills.insert(skill.to_lowercase()) {
                    parsed.skills.push(skill.to_string());
                }
            }
        }
        Section::Header | Section::Other => {}
    }
}

/// Recognizes a section heading, optionally followed by inline content
/// (`Skills: Rust, SQL`).
fn match_heading(line: &str) -> Option<(Section, &str)> {
    let (head, rest) = match line.split_once(':') {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    let key = head.trim().to_lowercase();
    let section = if EXPERIENCE_HEADINGS.contains(&key.as_str()) {
        Section::Experience
    } else if EDUCATION_HEADINGS.contains(&key.as_str()) {
        Section::Education
    } else if SKILLS_HEADINGS.contains(&key.as_str()) {
        Section::Skills
    } else if OTHER_HEADINGS.contains(&key.as_str()) {
        Section::Other
    } else {
        return None;
    };
    Some((section, rest))
}

fn strip_bullet(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['-', '*', '•', '–', '·', '▪'])
        .trim()
}

fn labelled_value(line: &str, labels: &[&str]) -> Option<String> {
    let (label, value) = line.split_once(':')?;
    let label = label.trim().to_lowercase();
    let value = value.trim();
    (labels.contains(&label.as_str()) && !value.is_empty()).then(|| value.to_string())
}

fn find_phone(line: &str) -> Option<String> {
    PHONE_RE.find_iter(line).find_map(|m| {
        let digits = m.as_str().chars().filter(|c| c.is_ascii_digit()).count();
        (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS)
            .contains(&digits)
            .then(|| m.as_str().trim().to_string())
    })
}

fn looks_like_name(line: &str) -> bool {
    if line.contains('@') || line.contains(':') || line.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    (2..=5).contains(&words.len())
        && words
            .iter()
            .all(|w| w.chars().all(|c| c.is_alphabetic() || matches!(c, '-' | '\'' | '.')))
        && !words.iter().any(|w| {
            let word = w.trim_matches('.').to_lowercase();
            NOT_NAME_WORDS.contains(&word.as_str())
        })
}
