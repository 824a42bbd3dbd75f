//! Persistence ports and backends.
//!
//! The reconciliation job may run concurrently with itself (overlapping cron
//! fires, retries after partial failure), so every save and every notified
//! transition is a transactional read-modify-write: read the current record,
//! decide on its current flags, then conditionally write.

use async_trait::async_trait;

use hoshimi_model::{Actor, ActorId, ActorRoster, JstTime, Plan, TimeRange, Video, VideoId};

use crate::error::{CoreError, Result};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Result of a notified-flag transition.
#[derive(Debug, Clone)]
pub struct NotifyTransition<T> {
    /// The stored record after the call, when one still exists.
    pub record: Option<T>,
    /// Whether this call performed the `false → true` flip. At most one
    /// concurrent caller observes `true` per record.
    pub updated: bool,
}

impl<T> NotifyTransition<T> {
    fn noop(record: Option<T>) -> Self {
        NotifyTransition {
            record,
            updated: false,
        }
    }

    fn updated(record: T) -> Self {
        NotifyTransition {
            record: Some(record),
            updated: true,
        }
    }
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Plans whose date falls inside `range`, ascending by date. A missing
    /// day is simply absent from the result; a stored plan with no entries
    /// is returned as-is.
    async fn find_plans(&self, range: TimeRange) -> Result<Vec<Plan>>;

    /// The most recently dated stored plan, or [`CoreError::NotFound`].
    async fn find_latest_plan(&self) -> Result<Plan>;

    /// Ordinary save path used by the reconciliation job.
    ///
    /// Merges the fragment into the stored plan for the same day under the
    /// fragment's revision tag, carrying the stored `notified` flag forward.
    /// Rejects a fixed plan with [`CoreError::PlanFixed`], leaving the
    /// stored row untouched.
    async fn save_plan(&self, plan: &Plan) -> Result<()>;

    /// Explicit administrative save that replaces the stored plan verbatim,
    /// fixed or not.
    async fn save_plan_forced(&self, plan: &Plan) -> Result<()>;

    /// Flip the day's plan to notified. A missing plan is a safe no-op.
    async fn mark_plan_notified(&self, date: JstTime) -> Result<NotifyTransition<Plan>>;
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Videos starting inside `range`, ascending by start time.
    async fn find_videos(&self, range: TimeRange) -> Result<Vec<Video>>;

    /// Videos whose notified flag is still unset.
    async fn find_unnotified_videos(&self) -> Result<Vec<Video>>;

    /// Upsert an observed video, preserving the stored notified flag and
    /// the union of related performer ids. When the stored record names a
    /// roster performer and the incoming one does not, the stored record
    /// wins: for a collaboration broadcast on a single channel, the owning
    /// channel's attribution is the one worth keeping.
    async fn save_video(&self, video: &Video) -> Result<()>;

    /// Flip a video to notified. A record deleted or replaced concurrently
    /// is a safe no-op.
    async fn mark_video_notified(&self, id: &VideoId) -> Result<NotifyTransition<Video>>;
}

#[async_trait]
pub trait ActorStore: Send + Sync {
    async fn find_actors(&self) -> Result<ActorRoster>;
    async fn save_actor(&self, actor: &Actor) -> Result<()>;
}

/// A backend providing all three record families.
pub trait Store: PlanStore + VideoStore + ActorStore {}
impl<T: PlanStore + VideoStore + ActorStore> Store for T {}

/// Shared ordinary-save semantics: what the new stored plan should be given
/// the current one, or a fixed-plan rejection.
pub(crate) fn merge_into_stored(stored: Option<&Plan>, incoming: &Plan) -> Result<Plan> {
    let tag = incoming.revision_tag.as_deref();
    match stored {
        None => {
            // First revision of the day: merging into an empty plan stamps
            // the tag and sorts, same as any later revision.
            let mut plan = Plan::new(incoming.date).merge_revision(incoming, tag);
            plan.revision_tag = incoming.revision_tag.clone();
            plan.notified = incoming.notified;
            plan.fixed = incoming.fixed;
            Ok(plan)
        }
        Some(stored) => {
            if stored.fixed {
                return Err(CoreError::PlanFixed(stored.date));
            }
            let mut merged = stored.merge_revision(incoming, tag);
            merged.revision_tag = incoming.revision_tag.clone();
            merged.notified = stored.notified;
            merged.fixed = stored.fixed;
            Ok(merged)
        }
    }
}

/// The related-performer union kept on a stored video: every known roster id
/// either record mentions, original order, no duplicates.
pub(crate) fn union_related_ids(incoming: &Video, stored: &Video) -> Vec<ActorId> {
    let mut result: Vec<ActorId> = Vec::new();

    fn push(result: &mut Vec<ActorId>, id: &ActorId) {
        if id.as_str().is_empty() || id.is_unknown() {
            return;
        }
        if !result.contains(id) {
            result.push(id.clone());
        }
    }

    for video in [incoming, stored] {
        push(&mut result, &video.actor_id);
        push(&mut result, &video.related_actor_id);
        for id in &video.related_actor_ids {
            push(&mut result, id);
        }
    }

    result
}
