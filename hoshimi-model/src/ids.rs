//! Strongly typed identifiers.
//!
//! Ids are platform-native strings (channel ids, video ids, announcement
//! ids), not locally generated values, so the newtypes wrap `String` and
//! exist purely to keep the two id spaces from mixing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved id for a video whose owning channel is not part of the roster,
/// or a plan entry that names a group/event rather than a single performer.
const UNKNOWN_ACTOR_ID: &str = "unknown";

/// Strongly typed id for performers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        ActorId(id.into())
    }

    /// The sentinel for "not one of the roster's own channels".
    pub fn unknown() -> Self {
        ActorId(UNKNOWN_ACTOR_ID.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_ACTOR_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        ActorId::new(id)
    }
}

/// Strongly typed id for observed videos, unique per platform item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        VideoId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(id: &str) -> Self {
        VideoId::new(id)
    }
}
