//! Cron-driven task endpoints.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::info;

use hoshimi_core::run_reconciliation;
use hoshimi_model::{JstTime, Plan};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Marker header the cron scheduler sets; mirrors the platform convention
/// of tagging scheduler-originated requests.
const CRON_HEADER: &str = "x-hoshimi-cron";

/// One reconciliation run: persist any plan revisions handed in with the
/// request, then drive the plan and stream-start notification passes.
pub async fn reconcile(
    State(state): State<AppState>,
    headers: HeaderMap,
    fragments: Option<Json<Vec<Plan>>>,
) -> AppResult<StatusCode> {
    if state.require_cron_header
        && headers.get(CRON_HEADER).and_then(|v| v.to_str().ok()) != Some("true")
    {
        return Err(AppError::forbidden("cron requests only"));
    }

    let fragments = fragments.map(|Json(f)| f).unwrap_or_default();
    let now = JstTime::now();
    let roster = state.store.find_actors().await?;

    info!(fragments = fragments.len(), "reconciliation run");
    run_reconciliation(
        state.store.as_ref(),
        state.sink.as_ref(),
        &roster,
        now,
        fragments,
        &state.settings,
    )
    .await?;

    Ok(StatusCode::OK)
}
