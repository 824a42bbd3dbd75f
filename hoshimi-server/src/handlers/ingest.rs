//! Ingest endpoints: the boundary where out-of-scope collaborators hand
//! their parsed or resolved records to the engine.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use hoshimi_model::{Actor, Plan, Video};

use crate::errors::AppResult;
use crate::state::AppState;

/// Ordinary save of a parsed plan revision. A fixed day answers 409 and
/// leaves the stored plan untouched.
pub async fn save_plan(
    State(state): State<AppState>,
    Json(fragment): Json<Plan>,
) -> AppResult<StatusCode> {
    info!(date = %fragment.date, tag = ?fragment.revision_tag, "ingest plan revision");
    state.store.save_plan(&fragment).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Administrative save that replaces the stored plan verbatim, fixed or not.
pub async fn save_plan_forced(
    State(state): State<AppState>,
    Json(plan): Json<Plan>,
) -> AppResult<StatusCode> {
    info!(date = %plan.date, fixed = plan.fixed, "forced plan save");
    state.store.save_plan_forced(&plan).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upsert a resolved video record.
pub async fn save_video(
    State(state): State<AppState>,
    Json(video): Json<Video>,
) -> AppResult<StatusCode> {
    info!(video = %video.id, source = %video.source, "ingest video");
    state.store.save_video(&video).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upsert a roster record.
pub async fn save_actor(
    State(state): State<AppState>,
    Json(actor): Json<Actor>,
) -> AppResult<StatusCode> {
    info!(actor = %actor.id, "ingest actor");
    state.store.save_actor(&actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
