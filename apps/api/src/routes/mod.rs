pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::attempts::handlers as attempts;
use crate::exams::handlers as exams;
use crate::screening::handlers as screening;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Screening
        .route("/api/v1/roles", post(screening::handle_create_role))
        .route("/api/v1/roles/:id", get(screening::handle_get_role))
        .route(
            "/api/v1/roles/:id/resumes",
            post(screening::handle_upload_resume)
                .layer(DefaultBodyLimit::max(screening::MAX_RESUME_BYTES + 64 * 1024)),
        )
        .route("/api/v1/resumes/:id", get(screening::handle_get_resume))
        .route(
            "/api/v1/candidates/me/applications",
            get(screening::handle_my_applications),
        )
        // Exams
        .route("/api/v1/exams", post(exams::handle_create_exam))
        .route("/api/v1/exams/:id", get(exams::handle_get_exam))
        .route("/api/v1/exams/:id/assign", post(attempts::handle_assign))
        // Attempts
        .route("/api/v1/attempts/:id", get(attempts::handle_get_attempt))
        .route("/api/v1/attempts/:id/start", post(attempts::handle_start))
        .route("/api/v1/attempts/:id/flags", post(attempts::handle_record_flag))
        .route("/api/v1/attempts/:id/answers", put(attempts::handle_save_progress))
        .route("/api/v1/attempts/:id/submit", post(attempts::handle_submit))
        .route("/api/v1/attempts/:id/expire", post(attempts::handle_expire))
        .with_state(state)
}
