use axum::extract::{Query, State};
use axum::Json;
use chrono::Duration;
use serde::Deserialize;

use hoshimi_core::{build_calendar, Calendar};
use hoshimi_model::{JstTime, TimeRange};

use crate::errors::{AppError, AppResult};
use crate::handlers::schedule::parse_day;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// Target month as `YYYY-MM`; the current month when omitted.
    pub month: Option<String>,
}

pub async fn get_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<Calendar>> {
    let now = JstTime::now();

    let base = match &query.month {
        Some(raw) => parse_month(raw)?,
        None => JstTime::date(now.year(), now.month(), 1)
            .ok_or_else(|| AppError::internal("current month out of range"))?,
    };

    // One day of slack on both sides, and up to noon past the month's end,
    // for the neighbouring plans each day's composition needs.
    let end = next_month_start(base).add(Duration::hours(12));
    let range = TimeRange::new(base.add_days(-1), end);

    let plans = state.store.find_plans(range).await?;
    let videos = state.store.find_videos(range).await?;
    let roster = state.store.find_actors().await?;

    Ok(Json(build_calendar(
        base,
        now,
        &plans,
        &videos,
        &roster,
        &state.settings,
    )))
}

fn parse_month(raw: &str) -> Result<JstTime, AppError> {
    parse_day(&format!("{raw}-01"))
        .map_err(|_| AppError::bad_request(format!("invalid month: {raw}")))
}

fn next_month_start(base: JstTime) -> JstTime {
    let (year, month) = if base.month() == 12 {
        (base.year() + 1, 1)
    } else {
        (base.year(), base.month() + 1)
    };

    // Every month has a first day; fall back to the base on the impossible.
    JstTime::date(year, month, 1).unwrap_or(base)
}
