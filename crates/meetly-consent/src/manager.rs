//! Consent manager: single source of truth for the visitor's decision.

use std::sync::Arc;

use meetly_core::ConsentConfig;
use meetly_store::{CookieJar, KeyValueStore};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::sanitizer::StorageSanitizer;
use crate::types::{
    ConsentCategory, ConsentEvents, ConsentOutcome, ConsentRecord, PreferenceUpdate,
};

/// Per-category flags the UI renders as toggle controls.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConsentPreferences {
    pub necessary: bool,
    pub analytics: bool,
    pub marketing: bool,
    pub functional: bool,
}

/// Owns the persisted consent record and the banner-visibility flag, and
/// mediates all reads and writes of the record.
///
/// Storage failures never surface to callers: every degraded path falls back
/// to showing the banner again or to best-effort continuation.
pub struct ConsentManager {
    config: ConsentConfig,
    persistent: Arc<dyn KeyValueStore>,
    sanitizer: StorageSanitizer,
    record: RwLock<Option<ConsentRecord>>,
    banner_visible: RwLock<bool>,
    listeners: RwLock<Vec<Box<dyn ConsentEvents>>>,
}

impl ConsentManager {
    pub fn new(
        config: ConsentConfig,
        persistent: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        cookies: Arc<dyn CookieJar>,
    ) -> Self {
        let sanitizer =
            StorageSanitizer::new(config.clone(), persistent.clone(), session, cookies);
        Self {
            config,
            persistent,
            sanitizer,
            record: RwLock::new(None),
            banner_visible: RwLock::new(false),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a UI-layer listener for accept/decline/activation events.
    pub fn subscribe(&self, listener: Box<dyn ConsentEvents>) {
        self.listeners.write().push(listener);
    }

    /// Load the persisted decision, if any.
    ///
    /// A missing record shows the banner. A malformed one is discarded,
    /// logged, and treated as missing. Neither case is an error.
    pub fn initialize(&self) {
        let stored = match self.persistent.get(&self.config.storage_key) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Consent storage unavailable: {}", e);
                None
            }
        };

        let raw = match stored {
            Some(raw) => raw,
            None => {
                *self.banner_visible.write() = true;
                info!("No consent decision on record, banner shown");
                return;
            }
        };

        match serde_json::from_str::<ConsentRecord>(&raw) {
            Ok(record) => {
                info!("Consent decision loaded, decided at {}", record.timestamp);
                for category in record.enabled_categories() {
                    self.notify_category(category);
                }
                *self.record.write() = Some(record);
                *self.banner_visible.write() = false;
            }
            Err(e) => {
                warn!("Discarding malformed consent record: {}", e);
                if let Err(e) = self.persistent.remove(&self.config.storage_key) {
                    warn!("Failed to drop malformed consent record: {}", e);
                }
                *self.banner_visible.write() = true;
            }
        }
    }

    /// Grant every category.
    pub fn accept_all(&self) -> ConsentOutcome {
        let record = ConsentRecord::accept_all();
        self.persist(&record);
        for category in record.enabled_categories() {
            self.notify_category(category);
        }
        *self.record.write() = Some(record);
        *self.banner_visible.write() = false;
        self.notify_outcome(ConsentOutcome::Accepted);
        info!("Consent: all categories accepted");
        ConsentOutcome::Accepted
    }

    /// Keep only the necessary category and purge everything else.
    pub fn decline_all(&self) -> ConsentOutcome {
        let record = ConsentRecord::decline_all();
        self.persist(&record);
        *self.record.write() = Some(record);
        *self.banner_visible.write() = false;
        self.sanitizer.purge();
        self.notify_outcome(ConsentOutcome::Declined);
        info!("Consent: optional categories declined");
        ConsentOutcome::Declined
    }

    /// Merge the given flags onto the current decision and persist the
    /// result. Counts as an accept when at least one optional category ends
    /// up enabled, as a decline otherwise.
    pub fn update_preferences(&self, update: PreferenceUpdate) -> ConsentOutcome {
        let base = self
            .record
            .read()
            .clone()
            .unwrap_or_else(ConsentRecord::decline_all);
        let record = ConsentRecord::new(
            update.analytics.unwrap_or(base.analytics),
            update.marketing.unwrap_or(base.marketing),
            update.functional.unwrap_or(base.functional),
        );
        self.persist(&record);

        let outcome = if record.any_optional_enabled() {
            ConsentOutcome::Accepted
        } else {
            ConsentOutcome::Declined
        };
        let should_purge = record.any_optional_disabled();

        if outcome == ConsentOutcome::Accepted {
            for category in record.enabled_categories() {
                self.notify_category(category);
            }
        }

        info!(
            "Consent preferences saved: analytics={} marketing={} functional={}",
            record.analytics, record.marketing, record.functional
        );
        *self.record.write() = Some(record);
        *self.banner_visible.write() = false;

        // Any disabled category triggers a purge, even when the save as a
        // whole counts as an accept.
        if should_purge {
            self.sanitizer.purge();
        }
        self.notify_outcome(outcome);
        outcome
    }

    /// Forget the decision entirely and show the banner again.
    pub fn reset(&self) {
        if let Err(e) = self.persistent.remove(&self.config.storage_key) {
            warn!("Failed to remove consent record: {}", e);
        }
        *self.record.write() = None;
        *self.banner_visible.write() = true;
        self.sanitizer.purge();
        info!("Consent reset, banner shown");
    }

    /// Whether the front end should render the consent banner.
    pub fn show_banner(&self) -> bool {
        *self.banner_visible.read()
    }

    /// Current decision, if one is recorded.
    pub fn record(&self) -> Option<ConsentRecord> {
        self.record.read().clone()
    }

    /// Per-category flags for rendering toggle controls. Defaults to
    /// necessary-only when no decision is recorded.
    pub fn preferences(&self) -> ConsentPreferences {
        match &*self.record.read() {
            Some(record) => ConsentPreferences {
                necessary: record.necessary,
                analytics: record.analytics,
                marketing: record.marketing,
                functional: record.functional,
            },
            None => ConsentPreferences {
                necessary: true,
                analytics: false,
                marketing: false,
                functional: false,
            },
        }
    }

    fn persist(&self, record: &ConsentRecord) {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode consent record: {}", e);
                return;
            }
        };
        if let Err(e) = self.persistent.set(&self.config.storage_key, &json) {
            warn!("Failed to persist consent record: {}", e);
        }
    }

    fn notify_category(&self, category: ConsentCategory) {
        for listener in self.listeners.read().iter() {
            listener.on_category_enabled(category);
        }
    }

    fn notify_outcome(&self, outcome: ConsentOutcome) {
        for listener in self.listeners.read().iter() {
            match outcome {
                ConsentOutcome::Accepted => listener.on_accept(),
                ConsentOutcome::Declined => listener.on_decline(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CONSENT_VERSION;
    use meetly_store::{MemoryCookieJar, MemoryStore};
    use parking_lot::Mutex;

    /// Listener that records every notification it receives.
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl ConsentEvents for Recorder {
        fn on_accept(&self) {
            self.events.lock().push("accept".into());
        }
        fn on_decline(&self) {
            self.events.lock().push("decline".into());
        }
        fn on_category_enabled(&self, category: ConsentCategory) {
            self.events.lock().push(format!("enable:{}", category));
        }
    }

    struct Fixture {
        manager: ConsentManager,
        persistent: Arc<MemoryStore>,
        session: Arc<MemoryStore>,
        jar: Arc<MemoryCookieJar>,
        events: Arc<Mutex<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        let persistent = Arc::new(MemoryStore::new());
        let session = Arc::new(MemoryStore::new());
        let jar = Arc::new(MemoryCookieJar::new());
        let manager = ConsentManager::new(
            ConsentConfig::default(),
            persistent.clone(),
            session.clone(),
            jar.clone(),
        );

        let events = Arc::new(Mutex::new(Vec::new()));
        manager.subscribe(Box::new(Recorder {
            events: events.clone(),
        }));

        Fixture {
            manager,
            persistent,
            session,
            jar,
            events,
        }
    }

    fn persisted_record(persistent: &MemoryStore) -> Option<ConsentRecord> {
        persistent
            .get("cookies-consent")
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[test]
    fn test_initialize_without_record_shows_banner() {
        let fx = fixture();
        fx.manager.initialize();
        assert!(fx.manager.show_banner());
        assert!(fx.manager.record().is_none());
        assert!(fx.events.lock().is_empty());
    }

    #[test]
    fn test_accept_all_persists_and_hides_banner() {
        let fx = fixture();
        fx.manager.initialize();
        let outcome = fx.manager.accept_all();

        assert_eq!(outcome, ConsentOutcome::Accepted);
        assert!(!fx.manager.show_banner());

        let record = persisted_record(&fx.persistent).unwrap();
        assert!(record.necessary && record.analytics && record.marketing && record.functional);
        assert_eq!(record.version, CONSENT_VERSION);

        let events = fx.events.lock();
        assert_eq!(
            *events,
            vec![
                "enable:necessary",
                "enable:analytics",
                "enable:marketing",
                "enable:functional",
                "accept",
            ]
        );
    }

    #[test]
    fn test_decision_survives_new_session() {
        let fx = fixture();
        fx.manager.initialize();
        fx.manager.accept_all();

        // A second manager over the same persistent store is a new session.
        let next = ConsentManager::new(
            ConsentConfig::default(),
            fx.persistent.clone(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCookieJar::new()),
        );
        next.initialize();

        assert!(!next.show_banner());
        let prefs = next.preferences();
        assert!(prefs.necessary && prefs.analytics && prefs.marketing && prefs.functional);
    }

    #[test]
    fn test_malformed_record_discarded_and_banner_shown() {
        let fx = fixture();
        fx.persistent
            .set("cookies-consent", r#"{"necessary": tru"#)
            .unwrap();

        fx.manager.initialize();

        assert!(fx.manager.show_banner());
        assert!(fx.manager.record().is_none());
        assert_eq!(fx.persistent.get("cookies-consent").unwrap(), None);
        assert!(fx.events.lock().is_empty());
    }

    #[test]
    fn test_decline_all_purges_and_notifies() {
        let fx = fixture();
        fx.manager.initialize();
        fx.jar.set("ad_tracker", "42");
        fx.session.set("scroll-position", "120").unwrap();

        let outcome = fx.manager.decline_all();

        assert_eq!(outcome, ConsentOutcome::Declined);
        assert!(!fx.manager.show_banner());
        assert!(fx.jar.get("ad_tracker").is_none());
        assert!(fx.session.get("scroll-position").unwrap().is_none());

        let record = persisted_record(&fx.persistent).unwrap();
        assert!(record.necessary);
        assert!(!record.analytics && !record.marketing && !record.functional);

        assert_eq!(*fx.events.lock(), vec!["decline"]);
    }

    #[test]
    fn test_decline_spares_the_consent_record_itself() {
        let fx = fixture();
        fx.manager.decline_all();
        // The record key is allow-listed, so the purge does not eat the
        // decision that was just persisted.
        assert!(persisted_record(&fx.persistent).is_some());
    }

    #[test]
    fn test_update_preferences_mixed_accepts_and_purges() {
        let fx = fixture();
        fx.manager.initialize();
        fx.jar.set("ad_tracker", "42");
        fx.persistent.set("ab-test-bucket", "B").unwrap();

        let outcome = fx.manager.update_preferences(PreferenceUpdate {
            analytics: Some(false),
            marketing: Some(true),
            functional: Some(true),
        });

        // One category off: purge fires, yet the save counts as an accept.
        assert_eq!(outcome, ConsentOutcome::Accepted);
        assert!(fx.jar.get("ad_tracker").is_none());
        assert!(fx.persistent.get("ab-test-bucket").unwrap().is_none());

        let record = persisted_record(&fx.persistent).unwrap();
        assert!(record.necessary);
        assert!(!record.analytics);
        assert!(record.marketing && record.functional);
        assert!(!record.timestamp.is_empty());

        let events = fx.events.lock();
        assert!(events.contains(&"accept".to_string()));
        assert!(!events.contains(&"decline".to_string()));
        assert!(events.contains(&"enable:marketing".to_string()));
        assert!(!events.contains(&"enable:analytics".to_string()));
    }

    #[test]
    fn test_update_preferences_all_off_is_decline() {
        let fx = fixture();
        fx.manager.accept_all();
        fx.events.lock().clear();

        let outcome = fx.manager.update_preferences(PreferenceUpdate {
            analytics: Some(false),
            marketing: Some(false),
            functional: Some(false),
        });

        assert_eq!(outcome, ConsentOutcome::Declined);
        assert_eq!(*fx.events.lock(), vec!["decline"]);
    }

    #[test]
    fn test_update_preferences_merges_onto_current() {
        let fx = fixture();
        fx.manager.accept_all();

        fx.manager.update_preferences(PreferenceUpdate {
            analytics: Some(false),
            ..Default::default()
        });

        let record = persisted_record(&fx.persistent).unwrap();
        // Untouched flags keep their accepted values.
        assert!(!record.analytics);
        assert!(record.marketing && record.functional);
    }

    #[test]
    fn test_update_preferences_fresh_base_defaults_off() {
        let fx = fixture();
        fx.manager.initialize();

        fx.manager.update_preferences(PreferenceUpdate {
            marketing: Some(true),
            ..Default::default()
        });

        let record = persisted_record(&fx.persistent).unwrap();
        assert!(!record.analytics && !record.functional);
        assert!(record.marketing);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let fx = fixture();
        fx.manager.accept_all();
        fx.events.lock().clear();

        fx.manager.reset();
        fx.manager.reset();

        assert!(fx.manager.show_banner());
        assert!(fx.manager.record().is_none());
        assert_eq!(fx.persistent.get("cookies-consent").unwrap(), None);
        // Reset emits no accept/decline outcome.
        assert!(fx.events.lock().is_empty());
    }

    #[test]
    fn test_necessary_true_across_all_operations() {
        let fx = fixture();
        fx.manager.accept_all();
        assert!(persisted_record(&fx.persistent).unwrap().necessary);

        fx.manager.decline_all();
        assert!(persisted_record(&fx.persistent).unwrap().necessary);

        fx.manager.update_preferences(PreferenceUpdate {
            analytics: Some(true),
            ..Default::default()
        });
        assert!(persisted_record(&fx.persistent).unwrap().necessary);
    }

    #[test]
    fn test_each_mutation_restamps_timestamp_format() {
        let fx = fixture();
        fx.manager.accept_all();
        let record = persisted_record(&fx.persistent).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
    }
}
