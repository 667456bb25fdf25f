//! Shared application state.

use std::sync::Arc;

use meetly_consent::ConsentManager;
use meetly_core::MeetlyConfig;
use meetly_store::{JsonFileStore, MemoryCookieJar, MemoryStore};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: MeetlyConfig,
    pub consent: ConsentManager,
}

impl AppState {
    /// Wire up the stores and the consent manager, then load any persisted
    /// decision.
    pub fn new(config: MeetlyConfig) -> Self {
        let persistent = Arc::new(JsonFileStore::open(&config.data_paths.storage_file));
        let session = Arc::new(MemoryStore::new());
        let cookies = Arc::new(MemoryCookieJar::new());

        let consent = ConsentManager::new(config.consent.clone(), persistent, session, cookies);
        consent.initialize();

        Self { config, consent }
    }
}
