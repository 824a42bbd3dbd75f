//! Observed broadcast/video events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ActorId, VideoId};
use crate::jst::JstTime;

/// The closed set of platforms a video can originate from.
///
/// YouTube is the primary platform with reliable start timestamps; the live
/// platforms report only the announcement time, which is why the matcher uses
/// a much wider fuzz window for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoSource {
    Youtube,
    Bilibili,
    Mildom,
}

impl VideoSource {
    pub fn is_primary(self) -> bool {
        matches!(self, VideoSource::Youtube)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VideoSource::Youtube => "youtube",
            VideoSource::Bilibili => "bilibili",
            VideoSource::Mildom => "mildom",
        }
    }

    /// Human-facing platform name for schedule notes.
    pub fn label(self) -> &'static str {
        match self {
            VideoSource::Youtube => "YouTube",
            VideoSource::Bilibili => "Bilibili",
            VideoSource::Mildom => "Mildom",
        }
    }

    /// Classify a broadcast URL into its source platform.
    ///
    /// The source set is fixed and small, so classification is a pure
    /// prefix-host check rather than open-ended dispatch.
    pub fn classify_url(url: &str) -> Option<VideoSource> {
        const YOUTUBE: &[&str] = &["https://www.youtube.com/", "https://youtu.be/"];
        const BILIBILI: &[&str] = &["https://live.bilibili.com/"];
        const MILDOM: &[&str] = &["https://www.mildom.com/", "https://mildom.com/"];

        let matches_any = |prefixes: &[&str]| prefixes.iter().any(|p| url.starts_with(p));

        if matches_any(YOUTUBE) {
            Some(VideoSource::Youtube)
        } else if matches_any(BILIBILI) {
            Some(VideoSource::Bilibili)
        } else if matches_any(MILDOM) {
            Some(VideoSource::Mildom)
        } else {
            None
        }
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown video source: {0}")]
pub struct ParseVideoSourceError(pub String);

impl FromStr for VideoSource {
    type Err = ParseVideoSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(VideoSource::Youtube),
            "bilibili" => Ok(VideoSource::Bilibili),
            "mildom" => Ok(VideoSource::Mildom),
            other => Err(ParseVideoSourceError(other.to_string())),
        }
    }
}

/// An observed broadcast or video event, produced by the out-of-scope
/// platform resolvers. Mutated only by the notified transition and by
/// start-time refresh before a stream goes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: VideoId,
    /// Owning performer, or [`ActorId::unknown`] when the owning channel is
    /// not one of the roster's own channels.
    pub actor_id: ActorId,
    /// For collaborations hosted on a non-roster channel: the roster member
    /// whose announcement surfaced this video.
    #[serde(default = "ActorId::unknown")]
    pub related_actor_id: ActorId,
    /// Further roster members known to appear; may or may not repeat
    /// `related_actor_id`.
    #[serde(default)]
    pub related_actor_ids: Vec<ActorId>,
    /// Display name of the owning channel.
    #[serde(default)]
    pub owner_name: String,
    pub source: VideoSource,
    pub url: String,
    /// Free-text description.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Live broadcast or premiere.
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub member_only: bool,
    #[serde(default)]
    pub notified: bool,
    pub start_at: JstTime,
}

impl Video {
    pub fn is_unknown_actor(&self) -> bool {
        self.actor_id.is_unknown()
    }

    /// The performer this video should be attributed to: the owner when the
    /// owner is a roster member, otherwise the related performer.
    pub fn effective_actor_id(&self) -> &ActorId {
        if self.is_unknown_actor() {
            &self.related_actor_id
        } else {
            &self.actor_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_url_dispatches_on_prefix() {
        assert_eq!(
            VideoSource::classify_url("https://www.youtube.com/watch?v=abc"),
            Some(VideoSource::Youtube),
        );
        assert_eq!(
            VideoSource::classify_url("https://live.bilibili.com/21307497"),
            Some(VideoSource::Bilibili),
        );
        assert_eq!(
            VideoSource::classify_url("https://www.mildom.com/10596535"),
            Some(VideoSource::Mildom),
        );
        assert_eq!(VideoSource::classify_url("https://example.com/watch"), None);
    }

    #[test]
    fn source_round_trips_through_str() {
        for s in [VideoSource::Youtube, VideoSource::Bilibili, VideoSource::Mildom] {
            assert_eq!(s.as_str().parse::<VideoSource>().unwrap(), s);
        }
    }
}
