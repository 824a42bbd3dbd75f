use hoshimi_model::ActorId;
use serde::Deserialize;

/// Tunable compensations for known data-quality quirks in the sources.
///
/// These are deployment configuration, not domain rules: the ids and names
/// involved belong to one specific talent group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSettings {
    /// Performer whose uploads are always treated as planned unless they are
    /// live broadcasts. Their upload announcements never carry schedule
    /// entries, which would otherwise flag every upload as a guerrilla.
    #[serde(default)]
    pub pinned_actor_id: Option<ActorId>,

    /// Display name of the group's shared channel. Videos it owns cannot be
    /// attributed to individual performers, so stream-start notifications
    /// for them are suppressed.
    #[serde(default)]
    pub shared_channel_name: Option<String>,
}

impl EngineSettings {
    /// Whether the video belongs to the pinned performer and is not live.
    pub fn forces_planned(&self, actor_id: &ActorId, is_live: bool) -> bool {
        !is_live && self.pinned_actor_id.as_ref() == Some(actor_id)
    }
}
