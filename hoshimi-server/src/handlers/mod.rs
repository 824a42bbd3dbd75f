pub mod calendar;
pub mod ingest;
pub mod schedule;
pub mod tasks;

use axum::http::StatusCode;

pub async fn health() -> StatusCode {
    StatusCode::OK
}
