//! Push-notification passes: mark-then-send with an at-most-once guarantee.
//!
//! The store transition is the gate: a notification is composed and handed
//! to the sink only when this run performed the `false → true` flip. A send
//! failure after a successful flip is logged and dropped; at most once beats
//! at least once for push notifications.

use async_trait::async_trait;
use chrono::Duration;
use tracing::{info, warn};

use hoshimi_model::{Actor, ActorRoster, JstTime, Plan, TimeRange, Video};

use crate::error::{CoreError, Result};
use crate::settings::EngineSettings;
use crate::store::{PlanStore, VideoStore};

/// The out-of-scope delivery transport. Message formatting and channel are
/// the implementor's concern.
#[async_trait]
pub trait NotifySink: Send + Sync {
    /// Announce a newly published day plan.
    async fn notify_plan(&self, plan: &Plan, roster: &ActorRoster) -> Result<()>;

    /// Announce a started stream. `base_date` is the day the appearance
    /// belongs to; `actors` every performer involved.
    async fn notify_video(&self, base_date: JstTime, video: &Video, actors: &[Actor])
        -> Result<()>;
}

/// Send the "new plan" notification for the latest stored plan, once.
pub async fn notify_latest_plan<S, N>(store: &S, sink: &N, roster: &ActorRoster) -> Result<()>
where
    S: PlanStore + ?Sized,
    N: NotifySink + ?Sized,
{
    let plan = match store.find_latest_plan().await {
        Ok(plan) => plan,
        Err(CoreError::NotFound) => return Ok(()),
        Err(e) => return Err(e),
    };

    if plan.notified {
        return Ok(());
    }

    let transition = store.mark_plan_notified(plan.date).await?;
    // Overlapping job runs race here; only the winner sends.
    if !transition.updated {
        return Ok(());
    }
    let Some(plan) = transition.record else {
        return Ok(());
    };

    info!(date = %plan.date, "push notify plan");
    if let Err(e) = sink.notify_plan(&plan, roster).await {
        warn!(date = %plan.date, error = %e, "plan notification failed");
    }

    Ok(())
}

/// Send "stream started" notifications for every not-yet-notified video.
pub async fn notify_videos<S, N>(
    store: &S,
    sink: &N,
    roster: &ActorRoster,
    now: JstTime,
    settings: &EngineSettings,
) -> Result<()>
where
    S: PlanStore + VideoStore + ?Sized,
    N: NotifySink + ?Sized,
{
    // Yesterday's, today's, and tomorrow's plans decide whether a stream
    // was declared.
    let range = TimeRange::new(now.add_days(-2), now.add_days(1));
    let plans = store.find_plans(range).await?;
    let videos = store.find_unnotified_videos().await?;

    // A stream that started more than two hours ago is old news.
    let freshness_limit = now.add(-Duration::hours(2));

    for video in videos {
        let mut planned = false;
        let mut start_at = video.start_at;
        let mut collabo_id = None;
        let mut target_plan: Option<&Plan> = None;

        for plan in &plans {
            let Some(index) = plan.entry_index(&video) else {
                continue;
            };
            let entry = &plan.entries[index];
            planned = true;
            // The live platforms report the announcement time, not the
            // start; trust the declaration instead.
            if !video.source.is_primary() {
                start_at = entry.start_at;
            }
            collabo_id = entry.collabo_id;
            target_plan = Some(plan);
            break;
        }

        // Not started yet; leave unnotified for a later run.
        if start_at > now {
            continue;
        }

        let transition = store.mark_video_notified(&video.id).await?;
        if !transition.updated {
            continue;
        }
        let Some(video) = transition.record else {
            continue;
        };

        if start_at < freshness_limit {
            info!(video = %video.id, start = %start_at, "skip notify: stale");
            continue;
        }

        if !video.source.is_primary() && !planned {
            info!(video = %video.id, source = %video.source, "skip notify: unplanned on live platform");
            continue;
        }

        if let Some(shared) = &settings.shared_channel_name
            && &video.owner_name == shared
        {
            // The shared channel's videos cannot name who appears.
            info!(video = %video.id, "skip notify: shared channel video");
            continue;
        }

        if settings.forces_planned(&video.actor_id, video.is_live) {
            planned = true;
        }

        let actors = resolve_notified_actors(&video, collabo_id, target_plan, roster);
        if actors.is_empty() {
            warn!(video = %video.id, actor = %video.effective_actor_id(), "skip notify: unknown actor");
            continue;
        }

        let base_date = if planned {
            target_plan.map(|p| p.date).unwrap_or(video.start_at)
        } else {
            video.start_at
        };

        info!(video = %video.id, planned, live = video.is_live, "push notify video");
        if let Err(e) = sink.notify_video(base_date, &video, &actors).await {
            warn!(video = %video.id, error = %e, "video notification failed");
            return Ok(());
        }
    }

    Ok(())
}

/// Everyone a stream-start notification should mention: the declared
/// collaboration group when there is one, else the video's own performers.
fn resolve_notified_actors(
    video: &Video,
    collabo_id: Option<u32>,
    target_plan: Option<&Plan>,
    roster: &ActorRoster,
) -> Vec<Actor> {
    let mut actors: Vec<Actor> = Vec::new();
    let mut push = |actor: Option<&Actor>, id: &hoshimi_model::ActorId| match actor {
        Some(actor) => {
            if !actors.iter().any(|a| a.id == actor.id) {
                actors.push(actor.clone());
            }
        }
        None => warn!(actor = %id, "unknown actor in notification"),
    };

    if let (Some(collabo_id), Some(plan)) = (collabo_id, target_plan) {
        for entry in &plan.entries {
            if entry.collabo_id != Some(collabo_id) || entry.is_unknown_actor() {
                continue;
            }
            push(roster.find(&entry.actor_id), &entry.actor_id);
        }
    } else {
        let primary = video.effective_actor_id();
        push(roster.find(primary), primary);
        for id in &video.related_actor_ids {
            push(roster.find(id), id);
        }
    }

    actors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::store::{MemoryStore, PlanStore, VideoStore};
    use hoshimi_model::{ActorId, PlanEntry, VideoId, VideoSource};

    #[derive(Default)]
    struct RecordingSink {
        plans: Mutex<Vec<Plan>>,
        videos: Mutex<Vec<(JstTime, Video, Vec<Actor>)>>,
    }

    #[async_trait]
    impl NotifySink for RecordingSink {
        async fn notify_plan(&self, plan: &Plan, _roster: &ActorRoster) -> Result<()> {
            self.plans.lock().unwrap().push(plan.clone());
            Ok(())
        }

        async fn notify_video(
            &self,
            base_date: JstTime,
            video: &Video,
            actors: &[Actor],
        ) -> Result<()> {
            self.videos
                .lock()
                .unwrap()
                .push((base_date, video.clone(), actors.to_vec()));
            Ok(())
        }
    }

    fn actor(id: &str, name: &str) -> Actor {
        Actor {
            id: ActorId::new(id),
            name: name.to_string(),
            icon: String::new(),
            screen_name: id.to_string(),
            hashtag: String::new(),
            emoji: String::new(),
            youtube_channel_id: String::new(),
            bilibili_id: None,
            mildom_id: None,
            last_announcement_id: String::new(),
        }
    }

    fn roster() -> ActorRoster {
        ActorRoster::new(vec![
            actor("suzu", "Suzu"),
            actor("chieri", "Chieri"),
            actor("futaba", "Futaba"),
        ])
    }

    fn entry(actor: &str, start: JstTime, source: VideoSource) -> PlanEntry {
        PlanEntry {
            actor_id: ActorId::new(actor),
            revision_tag: None,
            hashtag: String::new(),
            start_at: start,
            source,
            member_only: false,
            collabo_id: None,
        }
    }

    fn video(id: &str, actor: &str, start: JstTime, source: VideoSource) -> Video {
        Video {
            id: VideoId::new(id),
            actor_id: ActorId::new(actor),
            related_actor_id: ActorId::unknown(),
            related_actor_ids: Vec::new(),
            owner_name: String::new(),
            source,
            url: String::new(),
            text: String::new(),
            hashtags: Vec::new(),
            is_live: true,
            member_only: false,
            notified: false,
            start_at: start,
        }
    }

    fn day(d: u32) -> JstTime {
        JstTime::date(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn latest_plan_is_notified_at_most_once() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();
        let d = day(14);
        let plan = Plan {
            entries: vec![entry("suzu", d.add(Duration::hours(20)), VideoSource::Youtube)],
            ..Plan::new(d)
        };
        store.save_plan_forced(&plan).await.unwrap();

        notify_latest_plan(&store, &sink, &roster()).await.unwrap();
        notify_latest_plan(&store, &sink, &roster()).await.unwrap();

        assert_eq!(sink.plans.lock().unwrap().len(), 1);
        assert!(store.find_latest_plan().await.unwrap().notified);
    }

    #[tokio::test]
    async fn started_planned_video_is_notified_once_with_corrected_time() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();
        let d = day(14);
        let now = d.add(Duration::hours(19));

        let plan = Plan {
            entries: vec![entry("suzu", d.add(Duration::hours(19)), VideoSource::Mildom)],
            ..Plan::new(d)
        };
        store.save_plan_forced(&plan).await.unwrap();
        // Observed with the announcement timestamp, hours before the slot.
        store
            .save_video(&video("m1", "suzu", d.add(Duration::hours(14)), VideoSource::Mildom))
            .await
            .unwrap();

        let settings = EngineSettings::default();
        notify_videos(&store, &sink, &roster(), now, &settings).await.unwrap();
        notify_videos(&store, &sink, &roster(), now, &settings).await.unwrap();

        let sent = sink.videos.lock().unwrap();
        assert_eq!(sent.len(), 1);
        // Declared for today: the plan's day is the notification base date.
        assert_eq!(sent[0].0, d);
        assert_eq!(sent[0].2[0].id, ActorId::new("suzu"));
    }

    #[tokio::test]
    async fn future_videos_stay_unnotified_for_later_runs() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();
        let d = day(14);
        let now = d.add(Duration::hours(12));

        let plan = Plan {
            entries: vec![entry("suzu", d.add(Duration::hours(20)), VideoSource::Youtube)],
            ..Plan::new(d)
        };
        store.save_plan_forced(&plan).await.unwrap();
        store
            .save_video(&video("v1", "suzu", d.add(Duration::hours(20)), VideoSource::Youtube))
            .await
            .unwrap();

        notify_videos(&store, &sink, &roster(), now, &EngineSettings::default())
            .await
            .unwrap();

        assert!(sink.videos.lock().unwrap().is_empty());
        // Still unnotified: the flag must not burn before the stream starts.
        assert_eq!(store.find_unnotified_videos().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_videos_are_marked_but_not_sent() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();
        let d = day(14);
        let now = d.add(Duration::hours(23));

        let plan = Plan {
            entries: vec![entry("suzu", d.add(Duration::hours(20)), VideoSource::Youtube)],
            ..Plan::new(d)
        };
        store.save_plan_forced(&plan).await.unwrap();
        store
            .save_video(&video("v1", "suzu", d.add(Duration::hours(20)), VideoSource::Youtube))
            .await
            .unwrap();

        notify_videos(&store, &sink, &roster(), now, &EngineSettings::default())
            .await
            .unwrap();

        assert!(sink.videos.lock().unwrap().is_empty());
        // The transition still happened, so the stale stream never resurfaces.
        assert!(store.find_unnotified_videos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unplanned_live_platform_videos_are_suppressed() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();
        let d = day(14);
        let now = d.add(Duration::hours(21));

        let plan = Plan {
            entries: vec![entry("suzu", d.add(Duration::hours(20)), VideoSource::Youtube)],
            ..Plan::new(d)
        };
        store.save_plan_forced(&plan).await.unwrap();
        store
            .save_video(&video(
                "m1",
                "chieri",
                d.add(Duration::minutes(20 * 60 + 45)),
                VideoSource::Mildom,
            ))
            .await
            .unwrap();

        notify_videos(&store, &sink, &roster(), now, &EngineSettings::default())
            .await
            .unwrap();

        assert!(sink.videos.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn collaboration_notifications_mention_every_participant() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();
        let d = day(14);
        let now = d.add(Duration::minutes(20 * 60 + 5));

        let mut entries = Vec::new();
        for id in ["suzu", "chieri", "futaba"] {
            let mut e = entry(id, d.add(Duration::hours(20)), VideoSource::Youtube);
            e.collabo_id = Some(1);
            entries.push(e);
        }
        let plan = Plan {
            entries,
            ..Plan::new(d)
        };
        store.save_plan_forced(&plan).await.unwrap();
        store
            .save_video(&video("host", "suzu", d.add(Duration::hours(20)), VideoSource::Youtube))
            .await
            .unwrap();

        notify_videos(&store, &sink, &roster(), now, &EngineSettings::default())
            .await
            .unwrap();

        let sent = sink.videos.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let names: Vec<&str> = sent[0].2.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Suzu", "Chieri", "Futaba"]);
    }

    #[tokio::test]
    async fn shared_channel_videos_are_suppressed() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();
        let d = day(14);
        let now = d.add(Duration::minutes(20 * 60 + 5));

        let plan = Plan {
            entries: vec![entry("suzu", d.add(Duration::hours(20)), VideoSource::Youtube)],
            ..Plan::new(d)
        };
        store.save_plan_forced(&plan).await.unwrap();
        let mut v = video("g1", "suzu", d.add(Duration::hours(20)), VideoSource::Youtube);
        v.owner_name = "Group Official".to_string();
        store.save_video(&v).await.unwrap();

        let settings = EngineSettings {
            pinned_actor_id: None,
            shared_channel_name: Some("Group Official".to_string()),
        };
        notify_videos(&store, &sink, &roster(), now, &settings).await.unwrap();

        assert!(sink.videos.lock().unwrap().is_empty());
    }
}
