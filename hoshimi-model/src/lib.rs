//! Core data model definitions shared across Hoshimi crates.
//!
//! Everything in this crate is pure: the types describe declared plans,
//! observed videos, and composed schedules, and the only logic living here is
//! the reconciliation arithmetic that needs no I/O — fuzzy plan-entry
//! matching and tag-scoped plan revision merging.
#![allow(missing_docs)]

pub mod actor;
pub mod ids;
pub mod jst;
pub mod plan;
pub mod schedule;
pub mod video;

// Intentionally curated re-exports for downstream consumers.
pub use actor::{Actor, ActorRoster};
pub use ids::{ActorId, VideoId};
pub use jst::{JstTime, TimeRange};
pub use plan::{Plan, PlanEntry, PlanText};
pub use schedule::{Schedule, ScheduleEntry};
pub use video::{ParseVideoSourceError, Video, VideoSource};
