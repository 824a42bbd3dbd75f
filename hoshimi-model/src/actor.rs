//! Performer roster.

use serde::{Deserialize, Serialize};

use crate::ids::ActorId;

/// A roster member being scheduled.
///
/// The roster is immutable during a reconciliation run; records change only
/// through the administrative save path between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    /// Profile image URL shown in schedule entries.
    #[serde(default)]
    pub icon: String,
    /// Social handle the announcement parser follows.
    #[serde(default)]
    pub screen_name: String,
    /// Textual hashtag used to recognize the performer in free text.
    #[serde(default)]
    pub hashtag: String,
    /// Emoji marker used by announcement text.
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub youtube_channel_id: String,
    #[serde(default)]
    pub bilibili_id: Option<String>,
    #[serde(default)]
    pub mildom_id: Option<String>,
    /// Cursor for the out-of-scope announcement fetcher.
    #[serde(default)]
    pub last_announcement_id: String,
}

/// A snapshot of the full roster, taken once per reconciliation run and
/// threaded through every composition call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorRoster(Vec<Actor>);

impl ActorRoster {
    pub fn new(actors: Vec<Actor>) -> Self {
        ActorRoster(actors)
    }

    pub fn find(&self, id: &ActorId) -> Option<&Actor> {
        self.0.iter().find(|a| &a.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Actor> {
        self.0.iter().find(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Actor>> for ActorRoster {
    fn from(actors: Vec<Actor>) -> Self {
        ActorRoster::new(actors)
    }
}

impl<'a> IntoIterator for &'a ActorRoster {
    type Item = &'a Actor;
    type IntoIter = std::slice::Iter<'a, Actor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
