//! Declared per-day plans: entry matching and revision merging.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::ids::ActorId;
use crate::jst::{JstTime, TimeRange};
use crate::video::{Video, VideoSource};

/// One declared appearance inside a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub actor_id: ActorId,
    /// Tag of the announcement fragment that produced this entry.
    #[serde(default)]
    pub revision_tag: Option<String>,
    /// Group/event hashtag label. Non-empty only when `actor_id` is the
    /// unknown sentinel.
    #[serde(default)]
    pub hashtag: String,
    pub start_at: JstTime,
    pub source: VideoSource,
    #[serde(default)]
    pub member_only: bool,
    /// Shared by all entries of one joint broadcast; unique within a plan.
    #[serde(default)]
    pub collabo_id: Option<u32>,
}

impl PlanEntry {
    pub fn is_unknown_actor(&self) -> bool {
        self.actor_id.is_unknown()
    }

    /// The tolerance interval for matching an observed start time against
    /// this entry's declared start.
    ///
    /// YouTube reports accurate start times, so the window is tight. The
    /// live platforms only surface the announcement time; a stream declared
    /// for today may carry yesterday's timestamp, hence the full prior day
    /// of slack. Assumes at most one broadcast per day per entry.
    fn fuzz_window(&self, video_source: VideoSource) -> TimeRange {
        let (before, after) = match video_source {
            VideoSource::Youtube => (Duration::minutes(50), Duration::minutes(30)),
            VideoSource::Bilibili | VideoSource::Mildom => {
                (Duration::hours(26), Duration::minutes(30))
            }
        };

        TimeRange::new(self.start_at.add(-before), self.start_at.add(after))
    }
}

/// A text fragment of the announcement, kept for notification bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanText {
    #[serde(default)]
    pub revision_tag: Option<String>,
    /// Start instant of the first entry this text announced.
    pub start_at: JstTime,
    pub text: String,
}

/// The declared schedule for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// The day, floored to JST midnight.
    pub date: JstTime,
    /// Tag identifying the announcement fragment this value was parsed
    /// from; `None` on consolidated stored plans.
    #[serde(default)]
    pub revision_tag: Option<String>,
    /// Identifier of the originating announcement.
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub entries: Vec<PlanEntry>,
    #[serde(default)]
    pub texts: Vec<PlanText>,
    #[serde(default)]
    pub notified: bool,
    /// Frozen against ordinary job-driven overwrites.
    #[serde(default)]
    pub fixed: bool,
}

impl Plan {
    pub fn new(date: JstTime) -> Self {
        Plan {
            date: date.floor_to_day(),
            revision_tag: None,
            source_id: String::new(),
            entries: Vec::new(),
            texts: Vec::new(),
            notified: false,
            fixed: false,
        }
    }

    /// Whether the video corresponds to any declared entry.
    pub fn is_planned(&self, video: &Video) -> bool {
        self.entry_index(video).is_some()
    }

    /// Find the declared entry the video corresponds to.
    ///
    /// Entries are tried in declaration order and the first match wins; the
    /// entry list order is the only tie-break.
    pub fn entry_index(&self, video: &Video) -> Option<usize> {
        for (i, entry) in self.entries.iter().enumerate() {
            if !entry.fuzz_window(video.source).contains(video.start_at) {
                continue;
            }

            // Group/event entries carry no performer; recognize them by the
            // announcement hashtag instead.
            if entry.is_unknown_actor() {
                if video.hashtags.iter().any(|h| entry.hashtag.contains(h.as_str())) {
                    return Some(i);
                }
                continue;
            }

            if video.effective_actor_id() != &entry.actor_id {
                continue;
            }

            if video.source != entry.source {
                continue;
            }

            return Some(i);
        }

        None
    }

    /// Merge an announcement fragment into this plan, replacing the revision
    /// slot identified by `tag` and leaving every other slot untouched.
    ///
    /// The operation is idempotent: merging the same fragment under the same
    /// tag any number of times yields the same plan.
    pub fn merge_revision(&self, fragment: &Plan, tag: Option<&str>) -> Plan {
        let mut merged = self.clone();

        // Replace the revision slot wholesale.
        merged.entries.retain(|e| e.revision_tag.as_deref() != tag);
        merged.texts.retain(|t| t.revision_tag.as_deref() != tag);

        // Renumber incoming collaboration groups past the surviving ones so
        // ids stay unique within the plan.
        let base = merged
            .entries
            .iter()
            .filter_map(|e| e.collabo_id)
            .max()
            .unwrap_or(0);

        for entry in &fragment.entries {
            let duplicate = merged
                .entries
                .iter()
                .any(|e| e.actor_id == entry.actor_id && e.start_at == entry.start_at);
            if duplicate {
                continue;
            }

            let mut entry = entry.clone();
            entry.revision_tag = tag.map(str::to_owned);
            entry.collabo_id = entry.collabo_id.map(|id| id + base);
            merged.entries.push(entry);
        }
        merged.entries.sort_by_key(|e| e.start_at);

        for text in &fragment.texts {
            let mut text = text.clone();
            text.revision_tag = tag.map(str::to_owned);
            merged.texts.push(text);
        }
        merged.texts.sort_by_key(|t| t.start_at);

        if !fragment.source_id.is_empty() {
            merged.source_id = fragment.source_id.clone();
        }

        merged
    }

    /// The notification body: all announcement texts in chronological order.
    pub fn notification_text(&self) -> String {
        self.texts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
