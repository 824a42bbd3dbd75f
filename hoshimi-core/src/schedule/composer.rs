//! The per-day schedule composition algorithm.

use std::collections::HashSet;

use chrono::Duration;
use tracing::warn;

use hoshimi_model::{
    ActorRoster, JstTime, Plan, Schedule, ScheduleEntry, TimeRange, Video,
};

use crate::settings::EngineSettings;

/// Compose the authoritative schedule for one JST calendar day.
///
/// `plans` is the surrounding window of stored plans in ascending date order
/// (the previous day's plan is needed to release videos it claims, the next
/// day's to reject early guerrilla candidates); `videos` is the same window
/// of observed videos. Pure: reads its inputs and nothing else.
pub fn compose_schedule(
    date: JstTime,
    plans: &[Plan],
    videos: &[Video],
    roster: &ActorRoster,
    settings: &EngineSettings,
) -> Schedule {
    let day = date.floor_to_day();

    let Some(target_pos) = plans.iter().position(|p| p.date == day) else {
        return Schedule::empty(day);
    };
    let target = &plans[target_pos];

    // Without declared entries there is no window to anchor guerrilla
    // rejection against, so no videos are attributed at all.
    if target.entries.is_empty() {
        return Schedule::empty(day);
    }

    let window = schedule_window(target);

    let mut sorted: Vec<&Video> = videos.iter().collect();
    sorted.sort_by_key(|v| v.start_at);

    let mut entries: Vec<ScheduleEntry> = Vec::new();
    let mut consumed: HashSet<usize> = HashSet::new();
    // Indexes of video-backed collaboration entries, for the ownership pass.
    let mut collab_hosts: Vec<usize> = Vec::new();

    for video in sorted {
        // A late-night stream declared for yesterday belongs to yesterday's
        // schedule even when its timestamp crosses midnight.
        if plans[..target_pos].iter().any(|p| p.is_planned(video)) {
            continue;
        }

        let mut planned;
        let mut start_at = video.start_at;
        let mut collabo_id = None;
        let display;

        match target.entry_index(video) {
            Some(index) => {
                planned = true;
                let entry = &target.entries[index];
                collabo_id = entry.collabo_id;

                // The first video consuming an entry is shown at the
                // declared time, compensating for sources with inaccurate
                // timestamps; later videos on the same entry keep their own.
                if consumed.insert(index) {
                    start_at = entry.start_at;
                }

                display = if entry.is_unknown_actor() {
                    Some((entry.hashtag.clone(), String::new()))
                } else if video.is_unknown_actor() {
                    // Collaboration hosted on an outside channel: show who
                    // appears alongside whose channel it is.
                    roster.find(&video.related_actor_id).map(|related| {
                        (
                            format!("{} × {}", related.name, video.owner_name),
                            related.icon.clone(),
                        )
                    })
                } else {
                    roster
                        .find(&video.actor_id)
                        .map(|actor| (actor.name.clone(), actor.icon.clone()))
                };
            }
            None => {
                planned = false;

                if !window.contains(video.start_at) {
                    continue;
                }

                // Tomorrow's declared streams show up early; they are not
                // today's guerrillas.
                if plans[target_pos + 1..].iter().any(|p| p.is_planned(video)) {
                    continue;
                }

                // The live platforms cannot be trusted outside declared
                // windows.
                if !video.source.is_primary() {
                    continue;
                }

                display = if video.is_unknown_actor() {
                    Some((video.owner_name.clone(), String::new()))
                } else {
                    roster
                        .find(&video.actor_id)
                        .map(|actor| (actor.name.clone(), actor.icon.clone()))
                };
            }
        }

        let Some((actor_name, icon)) = display else {
            warn!(video = %video.id, actor = %video.effective_actor_id(), "unknown actor, skipping video");
            continue;
        };

        if settings.forces_planned(&video.actor_id, video.is_live) {
            planned = true;
        }

        entries.push(ScheduleEntry {
            actor_name,
            icon,
            note: ScheduleEntry::note_for(video.source, video.member_only),
            start_at,
            video_id: Some(video.id.clone()),
            url: video.url.clone(),
            source: video.source,
            planned,
            is_live: video.is_live,
            member_only: video.member_only,
            text: video.text.clone(),
            collabo_id,
        });

        if collabo_id.is_some() {
            collab_hosts.push(entries.len() - 1);
        }
    }

    // Declared entries no video consumed become "planned, no video yet"
    // rows.
    for (index, entry) in target.entries.iter().enumerate() {
        if consumed.contains(&index) {
            continue;
        }

        let (actor_name, icon) = if entry.is_unknown_actor() {
            (entry.hashtag.clone(), String::new())
        } else {
            match roster.find(&entry.actor_id) {
                Some(actor) => (actor.name.clone(), actor.icon.clone()),
                None => {
                    warn!(actor = %entry.actor_id, "unknown actor in plan entry, skipping");
                    continue;
                }
            }
        };

        entries.push(ScheduleEntry {
            actor_name,
            icon,
            note: ScheduleEntry::note_for(entry.source, entry.member_only),
            start_at: entry.start_at,
            video_id: None,
            url: String::new(),
            source: entry.source,
            planned: true,
            is_live: false,
            member_only: entry.member_only,
            text: String::new(),
            collabo_id: entry.collabo_id,
        });
    }

    // A joint broadcast is only observed on the host's channel; make the
    // other participants' placeholder rows show the host's identity.
    for &host_index in &collab_hosts {
        let host_name = entries[host_index].actor_name.clone();
        let host_icon = entries[host_index].icon.clone();
        let host_collabo = entries[host_index].collabo_id;

        for (index, entry) in entries.iter_mut().enumerate() {
            if index == host_index {
                continue;
            }
            if entry.collabo_id != host_collabo || entry.video_id.is_some() {
                continue;
            }
            entry.actor_name = host_name.clone();
            entry.icon = host_icon.clone();
        }
    }

    entries.sort_by_key(|e| e.start_at);

    Schedule {
        date: target.date,
        entries,
    }
}

/// The interval of observed start times attributable to the plan's day.
///
/// Runs to one second before next midnight, stretched to the latest declared
/// start when the plan encodes late-night slots past 24:00, plus a short
/// grace period for streams that begin slightly late.
fn schedule_window(plan: &Plan) -> TimeRange {
    let mut end = plan.date.add_days(1).add(-Duration::seconds(1));
    for entry in &plan.entries {
        if entry.start_at > end {
            end = entry.start_at;
        }
    }

    TimeRange::new(plan.date, end.add(Duration::minutes(30)))
}
