//! The composed, human-facing per-day schedule.

use serde::{Deserialize, Serialize};

use crate::ids::VideoId;
use crate::jst::JstTime;
use crate::video::VideoSource;

/// One row of the final schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Display name; for collaborations on an outside channel this is the
    /// combined "performer × channel" form.
    pub actor_name: String,
    #[serde(default)]
    pub icon: String,
    /// Short qualifier shown next to the name: member-only marker and, for
    /// non-YouTube sources, the platform name.
    #[serde(default)]
    pub note: String,
    pub start_at: JstTime,
    #[serde(default)]
    pub video_id: Option<VideoId>,
    #[serde(default)]
    pub url: String,
    pub source: VideoSource,
    /// Whether this appearance was declared in the day's plan.
    pub planned: bool,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub member_only: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub collabo_id: Option<u32>,
}

impl ScheduleEntry {
    /// Compose the note column for a source/member-only combination.
    pub fn note_for(source: VideoSource, member_only: bool) -> String {
        let mut parts = Vec::new();
        if !source.is_primary() {
            parts.push(source.label());
        }
        if member_only {
            parts.push("member-only");
        }
        parts.join(" / ")
    }
}

/// The finalized schedule for one JST calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub date: JstTime,
    pub entries: Vec<ScheduleEntry>,
}

impl Schedule {
    /// A schedule with no entries, used whenever a day has no anchoring plan.
    pub fn empty(date: JstTime) -> Self {
        Schedule {
            date: date.floor_to_day(),
            entries: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_encodes_platform_and_membership() {
        assert_eq!(ScheduleEntry::note_for(VideoSource::Youtube, false), "");
        assert_eq!(
            ScheduleEntry::note_for(VideoSource::Youtube, true),
            "member-only",
        );
        assert_eq!(
            ScheduleEntry::note_for(VideoSource::Bilibili, false),
            "Bilibili",
        );
        assert_eq!(
            ScheduleEntry::note_for(VideoSource::Mildom, true),
            "Mildom / member-only",
        );
    }
}
