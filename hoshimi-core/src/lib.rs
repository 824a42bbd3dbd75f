//! # Hoshimi Core
//!
//! The reconciliation engine behind the Hoshimi schedule aggregator.
//!
//! ## Overview
//!
//! `hoshimi-core` turns declared plans and observed videos into the
//! authoritative per-day schedule and drives the notify-once state
//! transitions external notifiers depend on:
//!
//! - **Schedule composition**: fusing a day's plan with its observed videos,
//!   including guerrilla detection and collaboration ownership rewriting
//! - **Calendar building**: month-level summaries of who appears on which day
//! - **Persistence ports**: trait-based plan/video/actor stores with a
//!   PostgreSQL backend and an in-memory backend for tests and development
//! - **Notification service**: at-most-once plan and stream-start
//!   notifications behind a transport-agnostic sink trait
//!
//! ## Architecture
//!
//! - [`schedule`]: the pure composition algorithms
//! - [`store`]: persistence ports and backends
//! - [`notify`]: mark-then-send notification passes
//! - [`reconcile`]: the periodic job orchestration
#![allow(missing_docs)]

pub mod error;
pub mod notify;
pub mod reconcile;
pub mod schedule;
pub mod settings;
pub mod store;

pub use error::{CoreError, Result};
pub use notify::NotifySink;
pub use reconcile::run_reconciliation;
pub use schedule::calendar::{build_calendar, Calendar, CalendarDay};
pub use schedule::composer::compose_schedule;
pub use settings::EngineSettings;
pub use store::{ActorStore, NotifyTransition, PlanStore, Store, VideoStore};
