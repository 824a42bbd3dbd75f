//! Month-level calendar: which performers appear on which day.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use hoshimi_model::{Actor, ActorId, ActorRoster, JstTime, Plan, ScheduleEntry, Video, VideoId};

use crate::schedule::composer::compose_schedule;
use crate::settings::EngineSettings;

/// One calendar day with at least one appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub day: u32,
    pub actor_ids: Vec<ActorId>,
}

/// Per-day performer summary for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub base_date: JstTime,
    /// Last day old enough that its plan is frozen against job overwrites.
    #[serde(default)]
    pub fixed_day: Option<u32>,
    pub days: Vec<CalendarDay>,
}

/// Build the calendar for the month containing `base_date`, starting at
/// `base_date` itself.
///
/// `plans` and `videos` must cover the month plus one day of slack on both
/// sides, since each day's schedule needs its neighbours.
pub fn build_calendar(
    base_date: JstTime,
    now: JstTime,
    plans: &[Plan],
    videos: &[Video],
    roster: &ActorRoster,
    settings: &EngineSettings,
) -> Calendar {
    let base = base_date.floor_to_day();
    let fixed_limit = now.add_days(-2);

    let video_map: HashMap<&VideoId, &Video> = videos.iter().map(|v| (&v.id, v)).collect();

    let mut fixed_day = None;
    // Days older than two days are certainly frozen even when the month
    // starts before the requested base date.
    if let Some(month_start) = JstTime::date(base.year(), base.month(), 1)
        && month_start < fixed_limit
        && fixed_limit < base
    {
        fixed_day = Some(fixed_limit.day());
    }

    let mut days = Vec::new();
    let mut day = base;
    while day.month() == base.month() {
        if day < fixed_limit {
            fixed_day = Some(day.day());
        }

        let schedule = compose_schedule(day, plans, videos, roster, settings);

        let mut actor_ids: Vec<ActorId> = Vec::new();
        for entry in &schedule.entries {
            for actor in actors_for_entry(entry, &video_map, roster) {
                if !actor_ids.contains(&actor.id) {
                    actor_ids.push(actor.id.clone());
                }
            }
        }

        if !actor_ids.is_empty() {
            days.push(CalendarDay {
                day: day.day(),
                actor_ids,
            });
        }

        day = day.add_days(1);
    }

    Calendar {
        base_date: base,
        fixed_day,
        days,
    }
}

/// Every roster member appearing in a schedule entry: through its video when
/// one is attached, by display name otherwise.
fn actors_for_entry<'a>(
    entry: &ScheduleEntry,
    video_map: &HashMap<&VideoId, &'a Video>,
    roster: &'a ActorRoster,
) -> Vec<&'a Actor> {
    let Some(video_id) = &entry.video_id else {
        return roster
            .find_by_name(&entry.actor_name)
            .map(|a| vec![a])
            .unwrap_or_default();
    };

    let Some(video) = video_map.get(video_id) else {
        return Vec::new();
    };

    let mut result: Vec<&Actor> = Vec::new();
    let mut push = |id: &ActorId| {
        if result.iter().any(|a| &a.id == id) {
            return;
        }
        match roster.find(id) {
            Some(actor) => result.push(actor),
            None => warn!(actor = %id, "unknown actor referenced by video"),
        }
    };

    if video.is_unknown_actor() {
        push(&video.related_actor_id);
        // The extra related ids may or may not repeat the primary one.
        for id in &video.related_actor_ids {
            push(id);
        }
    } else {
        push(&video.actor_id);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hoshimi_model::{PlanEntry, VideoSource};

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

    fn entry(actor: &str, start: JstTime) -> PlanEntry {
        PlanEntry {
            actor_id: ActorId::new(actor),
            revision_tag: None,
            hashtag: String::new(),
            start_at: start,
            source: VideoSource::Youtube,
            member_only: false,
            collabo_id: None,
        }
    }

    #[test]
    fn collects_actors_per_day_and_skips_empty_days() {
        let roster = ActorRoster::new(vec![actor("suzu", "Suzu"), actor("chieri", "Chieri")]);
        let base = JstTime::date(2024, 6, 1).unwrap();
        let now = JstTime::date(2024, 6, 20).unwrap();

        let d14 = JstTime::date(2024, 6, 14).unwrap();
        let d15 = JstTime::date(2024, 6, 15).unwrap();
        let plans = vec![
            Plan {
                entries: vec![
                    entry("suzu", d14.add(Duration::hours(20))),
                    entry("chieri", d14.add(Duration::hours(22))),
                ],
                ..Plan::new(d14)
            },
            Plan {
                entries: vec![entry("suzu", d15.add(Duration::hours(21)))],
                ..Plan::new(d15)
            },
        ];

        let calendar = build_calendar(
            base,
            now,
            &plans,
            &[],
            &roster,
            &EngineSettings::default(),
        );

        assert_eq!(calendar.days.len(), 2);
        assert_eq!(calendar.days[0].day, 14);
        assert_eq!(
            calendar.days[0].actor_ids,
            vec![ActorId::new("suzu"), ActorId::new("chieri")],
        );
        assert_eq!(calendar.days[1].day, 15);
        // Days older than two days before `now` are frozen.
        assert_eq!(calendar.fixed_day, Some(17));
    }
}
