//! # Hoshimi Server
//!
//! HTTP surface for the Hoshimi schedule aggregator.
//!
//! ## Overview
//!
//! The server exposes:
//!
//! - **Read API**: composed per-day schedules and month calendars as JSON
//! - **Ingest API**: the boundary where out-of-scope collaborators hand in
//!   parsed plan revisions, resolved video records, and roster updates
//! - **Task endpoint**: the cron-guarded reconciliation and notification run
//!
//! ## Architecture
//!
//! Built on Axum over the `hoshimi-core` engine, with PostgreSQL (or an
//! in-memory store for development) underneath and a log-only notification
//! sink standing in for the push transport.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod sink;
pub mod state;
