//! In-memory persistence backend.
//!
//! Mirrors the Postgres backend's semantics behind a single mutex, which is
//! all the transaction isolation a process-local map needs. Used by tests
//! and by development runs without a database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use hoshimi_model::{Actor, ActorRoster, JstTime, Plan, TimeRange, Video, VideoId};

use crate::error::Result;
use crate::store::{
    merge_into_stored, union_related_ids, ActorStore, NotifyTransition, PlanStore, VideoStore,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    plans: BTreeMap<JstTime, Plan>,
    videos: BTreeMap<VideoId, Video>,
    actors: Vec<Actor>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_actors(actors: Vec<Actor>) -> Self {
        let store = Self::new();
        store.inner.lock().await.actors = actors;
        store
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn find_plans(&self, range: TimeRange) -> Result<Vec<Plan>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .plans
            .values()
            .filter(|p| range.contains(p.date))
            .cloned()
            .collect())
    }

    async fn find_latest_plan(&self) -> Result<Plan> {
        let inner = self.inner.lock().await;
        inner
            .plans
            .values()
            .next_back()
            .cloned()
            .ok_or(crate::error::CoreError::NotFound)
    }

    async fn save_plan(&self, plan: &Plan) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let date = plan.date.floor_to_day();
        let merged = merge_into_stored(inner.plans.get(&date), plan)?;
        inner.plans.insert(date, merged);
        Ok(())
    }

    async fn save_plan_forced(&self, plan: &Plan) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.plans.insert(plan.date.floor_to_day(), plan.clone());
        Ok(())
    }

    async fn mark_plan_notified(&self, date: JstTime) -> Result<NotifyTransition<Plan>> {
        let mut inner = self.inner.lock().await;
        let Some(plan) = inner.plans.get_mut(&date.floor_to_day()) else {
            return Ok(NotifyTransition::noop(None));
        };

        if plan.notified {
            return Ok(NotifyTransition::noop(Some(plan.clone())));
        }

        plan.notified = true;
        Ok(NotifyTransition::updated(plan.clone()))
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn find_videos(&self, range: TimeRange) -> Result<Vec<Video>> {
        let inner = self.inner.lock().await;
        let mut videos: Vec<Video> = inner
            .videos
            .values()
            .filter(|v| range.contains(v.start_at))
            .cloned()
            .collect();
        videos.sort_by_key(|v| v.start_at);
        Ok(videos)
    }

    async fn find_unnotified_videos(&self) -> Result<Vec<Video>> {
        let inner = self.inner.lock().await;
        let mut videos: Vec<Video> = inner
            .videos
            .values()
            .filter(|v| !v.notified)
            .cloned()
            .collect();
        videos.sort_by_key(|v| v.start_at);
        Ok(videos)
    }

    async fn save_video(&self, video: &Video) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let merged = match inner.videos.get(&video.id) {
            Some(stored) => {
                if !stored.actor_id.is_unknown() && video.actor_id.is_unknown() {
                    return Ok(());
                }

                let mut merged = video.clone();
                merged.notified = stored.notified;
                merged.related_actor_ids = union_related_ids(video, stored);
                merged
            }
            None => video.clone(),
        };

        inner.videos.insert(merged.id.clone(), merged);
        Ok(())
    }

    async fn mark_video_notified(&self, id: &VideoId) -> Result<NotifyTransition<Video>> {
        let mut inner = self.inner.lock().await;
        let Some(video) = inner.videos.get_mut(id) else {
            return Ok(NotifyTransition::noop(None));
        };

        if video.notified {
            return Ok(NotifyTransition::noop(Some(video.clone())));
        }

        video.notified = true;
        Ok(NotifyTransition::updated(video.clone()))
    }
}

#[async_trait]
impl ActorStore for MemoryStore {
    async fn find_actors(&self) -> Result<ActorRoster> {
        let inner = self.inner.lock().await;
        Ok(ActorRoster::new(inner.actors.clone()))
    }

    async fn save_actor(&self, actor: &Actor) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.actors.iter_mut().find(|a| a.id == actor.id) {
            Some(existing) => *existing = actor.clone(),
            None => inner.actors.push(actor.clone()),
        }
        Ok(())
    }
}
