use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, calendar, ingest, schedule, tasks};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/api/schedule", get(schedule::get_schedule))
        .route("/api/calendar", get(calendar::get_calendar))
        .route("/api/plans", post(ingest::save_plan))
        .route("/api/plans/forced", post(ingest::save_plan_forced))
        .route("/api/videos", post(ingest::save_video))
        .route("/api/actors", post(ingest::save_actor))
        .route("/tasks/reconcile", post(tasks::reconcile))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
