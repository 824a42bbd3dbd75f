//! The periodic reconciliation run.
//!
//! Persists freshly parsed plan revisions and drives both notification
//! passes. Every state transition underneath is idempotent, so the whole
//! run is safe to retry after a transient store failure.

use tracing::{info, warn};

use hoshimi_model::{ActorRoster, JstTime, Plan};

use crate::error::{CoreError, Result};
use crate::notify::{notify_latest_plan, notify_videos, NotifySink};
use crate::settings::EngineSettings;
use crate::store::{PlanStore, VideoStore};

/// Run one reconciliation pass.
///
/// `fragments` are the plan revisions parsed since the last run, in any
/// order; they are applied oldest day first so a multi-day announcement
/// lands consistently.
pub async fn run_reconciliation<S, N>(
    store: &S,
    sink: &N,
    roster: &ActorRoster,
    now: JstTime,
    mut fragments: Vec<Plan>,
    settings: &EngineSettings,
) -> Result<()>
where
    S: PlanStore + VideoStore + ?Sized,
    N: NotifySink + ?Sized,
{
    fragments.sort_by_key(|p| p.date);

    for fragment in &fragments {
        // An announcement revising a day more than two days gone is noise.
        if fragment.date < now.add_days(-2) {
            warn!(date = %fragment.date, "ignoring revision for a long-past day");
            continue;
        }

        match store.save_plan(fragment).await {
            Ok(()) => info!(date = %fragment.date, "plan revision saved"),
            Err(CoreError::PlanFixed(date)) => {
                info!(date = %date, "plan is fixed; revision ignored");
            }
            Err(e) => return Err(e),
        }
    }

    notify_latest_plan(store, sink, roster).await?;
    notify_videos(store, sink, roster, now, settings).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    use crate::store::{MemoryStore, PlanStore};
    use hoshimi_model::{Actor, ActorId, PlanEntry, Video, VideoSource};

    #[derive(Default)]
    struct CountingSink {
        plans: Mutex<usize>,
        videos: Mutex<usize>,
    }

    #[async_trait]
    impl NotifySink for CountingSink {
        async fn notify_plan(&self, _plan: &Plan, _roster: &ActorRoster) -> Result<()> {
            *self.plans.lock().unwrap() += 1;
            Ok(())
        }

        async fn notify_video(
            &self,
            _base_date: JstTime,
            _video: &Video,
            _actors: &[Actor],
        ) -> Result<()> {
            *self.videos.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn fragment(date: JstTime, tag: &str, actor: &str, hour: i64) -> Plan {
        Plan {
            revision_tag: Some(tag.to_string()),
            source_id: format!("announce-{tag}"),
            entries: vec![PlanEntry {
                actor_id: ActorId::new(actor),
                revision_tag: Some(tag.to_string()),
                hashtag: String::new(),
                start_at: date.add(Duration::hours(hour)),
                source: VideoSource::Youtube,
                member_only: false,
                collabo_id: None,
            }],
            ..Plan::new(date)
        }
    }

    fn roster() -> ActorRoster {
        ActorRoster::new(vec![Actor {
            id: ActorId::new("suzu"),
            name: "Suzu".to_string(),
            icon: String::new(),
            screen_name: "suzu".to_string(),
            hashtag: String::new(),
            emoji: String::new(),
            youtube_channel_id: String::new(),
            bilibili_id: None,
            mildom_id: None,
            last_announcement_id: String::new(),
        }])
    }

    #[tokio::test]
    async fn retrying_a_run_does_not_renotify() {
        let store = MemoryStore::new();
        let sink = CountingSink::default();
        let d = JstTime::date(2024, 6, 14).unwrap();
        let now = d.add(Duration::hours(12));
        let fragments = vec![fragment(d, "a", "suzu", 20)];

        run_reconciliation(&store, &sink, &roster(), now, fragments.clone(), &EngineSettings::default())
            .await
            .unwrap();
        run_reconciliation(&store, &sink, &roster(), now, fragments, &EngineSettings::default())
            .await
            .unwrap();

        assert_eq!(*sink.plans.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn stale_and_fixed_fragments_are_tolerated() {
        let store = MemoryStore::new();
        let sink = CountingSink::default();
        let d = JstTime::date(2024, 6, 14).unwrap();
        let now = d.add(Duration::hours(12));

        let mut fixed = fragment(d.add_days(-1), "a", "suzu", 20);
        fixed.fixed = true;
        store.save_plan_forced(&fixed).await.unwrap();

        let fragments = vec![
            // Long past: ignored.
            fragment(d.add_days(-10), "old", "suzu", 20),
            // Fixed day: rejected by the store, tolerated by the run.
            fragment(d.add_days(-1), "b", "suzu", 21),
            // Today: saved.
            fragment(d, "c", "suzu", 22),
        ];

        run_reconciliation(&store, &sink, &roster(), now, fragments, &EngineSettings::default())
            .await
            .unwrap();

        let plans = store
            .find_plans(hoshimi_model::TimeRange::new(d.add_days(-20), d.add_days(1)))
            .await
            .unwrap();
        assert_eq!(plans.len(), 2);
        let fixed_day = plans.iter().find(|p| p.date == d.add_days(-1)).unwrap();
        assert_eq!(fixed_day.entries[0].start_at, d.add_days(-1).add(Duration::hours(20)));
    }
}
