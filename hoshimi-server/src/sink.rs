//! Stand-in notification transport.
//!
//! The real delivery channel (push messaging) lives outside this service;
//! this sink records what would have been sent in the server log, which is
//! also exactly what development runs want.

use async_trait::async_trait;
use tracing::info;

use hoshimi_core::{NotifySink, Result};
use hoshimi_model::{Actor, ActorRoster, JstTime, Plan, Video};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotifySink for LogSink {
    async fn notify_plan(&self, plan: &Plan, _roster: &ActorRoster) -> Result<()> {
        info!(
            date = %plan.date,
            entries = plan.entries.len(),
            text = %plan.notification_text(),
            "notify: new plan",
        );
        Ok(())
    }

    async fn notify_video(
        &self,
        base_date: JstTime,
        video: &Video,
        actors: &[Actor],
    ) -> Result<()> {
        let names = actors.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ");
        info!(
            video = %video.id,
            date = %base_date,
            url = %video.url,
            actors = %names,
            "notify: stream started",
        );
        Ok(())
    }
}
