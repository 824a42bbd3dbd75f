use std::sync::Arc;

use hoshimi_core::{EngineSettings, NotifySink, Store};

/// Shared handler state: one store, one notification sink, and the engine
/// compensations, all fixed at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sink: Arc<dyn NotifySink>,
    pub settings: EngineSettings,
    pub require_cron_header: bool,
}
