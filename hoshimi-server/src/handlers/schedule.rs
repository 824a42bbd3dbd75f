use axum::extract::{Query, State};
use axum::Json;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;

use hoshimi_core::compose_schedule;
use hoshimi_model::{JstTime, Schedule, TimeRange};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    /// Target day as `YYYY-MM-DD`; today when omitted.
    pub date: Option<String>,
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> AppResult<Json<Schedule>> {
    let date = match &query.date {
        Some(raw) => parse_day(raw)?,
        None => JstTime::now().floor_to_day(),
    };

    // Composition needs the previous day's plan and videos up to noon of
    // the next day.
    let range = TimeRange::new(date.add_days(-1), date.add_days(1).add(Duration::hours(12)));
    let plans = state.store.find_plans(range).await?;
    let videos = state.store.find_videos(range).await?;
    let roster = state.store.find_actors().await?;

    Ok(Json(compose_schedule(
        date,
        &plans,
        &videos,
        &roster,
        &state.settings,
    )))
}

pub(crate) fn parse_day(raw: &str) -> Result<JstTime, AppError> {
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("invalid date: {raw}")))?;

    JstTime::date(parsed.year(), parsed.month(), parsed.day())
        .ok_or_else(|| AppError::bad_request(format!("invalid date: {raw}")))
}
