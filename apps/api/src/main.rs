mod attempts;
mod config;
mod db;
mod errors;
mod exams;
mod identity;
mod llm_client;
mod models;
mod routes;
mod screening;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::attempts::flags::FlagPolicy;
use crate::attempts::service::AttemptService;
use crate::attempts::store::PgAttemptStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::exams::question_source::{LlmQuestionSource, QuestionSource, SkillBankSource};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::screening::scoring::KeywordResumeScorer;
use crate::screening::storage::S3DocumentStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting recruit API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let s3 = build_s3_client(&config).await;
    let documents = Arc::new(S3DocumentStore::new(
        s3,
        config.s3_bucket.clone(),
        config.storage_timeout,
    ));
    info!("Document store: s3://{}", config.s3_bucket);

    let questions: Arc<dyn QuestionSource> = match (&config.anthropic_api_key, config.enable_llm_questions) {
        (Some(key), true) => {
            info!("Question source: LLM (model: {})", llm_client::MODEL);
            Arc::new(LlmQuestionSource(LlmClient::new(key.clone())?))
        }
        _ => {
            info!("Question source: skill bank");
            Arc::new(SkillBankSource)
        }
    };

    let attempts = AttemptService::new(
        Arc::new(PgAttemptStore::new(db.clone())),
        FlagPolicy {
            recurrence_threshold: config.flag_recurrence_threshold,
        },
        config.open_ended_grading,
    );
    info!(
        "Qualification threshold {}, open-ended grading {:?}",
        config.qualification_threshold, config.open_ended_grading
    );

    let state = AppState {
        db,
        documents,
        scorer: Arc::new(KeywordResumeScorer),
        questions,
        attempts,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// S3 client for MinIO locally or AWS in production, with static credentials.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "recruit-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
