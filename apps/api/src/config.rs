use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::exams::grader::OpenEndedPolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: Option<String>,
    pub enable_llm_questions: bool,
    pub qualification_threshold: u8,
    pub default_pass_mark: u8,
    pub default_time_limit_minutes: u32,
    pub open_ended_grading: OpenEndedPolicy,
    pub flag_recurrence_threshold: usize,
    pub storage_timeout: Duration,
    pub generation_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let config = Config {
            database_url: require("DATABASE_URL")?,
            s3_bucket: require("S3_BUCKET")?,
            s3_endpoint: require("S3_ENDPOINT")?,
            aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()),
            enable_llm_questions: parse_or(&lookup, "ENABLE_LLM_QUESTIONS", false)?,
            qualification_threshold: parse_or(&lookup, "QUALIFICATION_THRESHOLD", 60)?,
            default_pass_mark: parse_or(&lookup, "DEFAULT_PASS_MARK", 70)?,
            default_time_limit_minutes: parse_or(&lookup, "DEFAULT_TIME_LIMIT_MINUTES", 30)?,
            open_ended_grading: lookup("OPEN_ENDED_GRADING")
                .map(|v| OpenEndedPolicy::from_str(v.trim()))
                .transpose()
                .map_err(anyhow::Error::msg)
                .context("OPEN_ENDED_GRADING must be 'manual' or 'keyword'")?
                .unwrap_or_default(),
            flag_recurrence_threshold: parse_or(&lookup, "FLAG_RECURRENCE_THRESHOLD", 3)?,
            storage_timeout: Duration::from_secs(parse_or(&lookup, "STORAGE_TIMEOUT_SECS", 10)?),
            generation_timeout: Duration::from_secs(parse_or(
                &lookup,
                "GENERATION_TIMEOUT_SECS",
                90,
            )?),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if config.qualification_threshold > 100 {
            bail!("QUALIFICATION_THRESHOLD must be between 0 and 100");
        }
        if config.default_pass_mark > 100 {
            bail!("DEFAULT_PASS_MARK must be between 0 and 100");
        }
        if config.default_time_limit_minutes == 0 {
            bail!("DEFAULT_TIME_LIMIT_MINUTES must be positive");
        }
        if config.flag_recurrence_threshold == 0 {
            bail!("FLAG_RECURRENCE_THRESHOLD must be positive");
        }
        if config.enable_llm_questions && config.anthropic_api_key.is_none() {
            bail!("ENABLE_LLM_QUESTIONS requires ANTHROPIC_API_KEY");
        }

        Ok(config)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
