//! Best-effort purge of cookies and storage entries without consent coverage.

use std::sync::Arc;

use meetly_core::ConsentConfig;
use meetly_store::{CookieJar, KeyValueStore};
use tracing::{debug, warn};

/// Expiry stamp used to delete cookies.
const EPOCH_EXPIRY: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Deletes non-essential browser-side state after a decline or category
/// downgrade. Allow-listed cookies and storage keys survive.
pub struct StorageSanitizer {
    config: ConsentConfig,
    persistent: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    cookies: Arc<dyn CookieJar>,
}

impl StorageSanitizer {
    pub fn new(
        config: ConsentConfig,
        persistent: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        cookies: Arc<dyn CookieJar>,
    ) -> Self {
        Self {
            config,
            persistent,
            session,
            cookies,
        }
    }

    /// Delete every cookie and storage entry that is not allow-listed.
    ///
    /// Individual deletion failures are logged and skipped; a purge never
    /// fails as a whole.
    pub fn purge(&self) {
        self.purge_cookies();
        self.purge_store(self.persistent.as_ref(), "persistent");
        self.purge_store(self.session.as_ref(), "session");
    }

    fn purge_cookies(&self) {
        let header = self.cookies.cookie_header();
        for entry in header.split(';') {
            let name = entry.split('=').next().unwrap_or("").trim();
            if name.is_empty() {
                continue;
            }
            if self
                .config
                .cookie_allowlist
                .iter()
                .any(|keep| name.contains(keep.as_str()))
            {
                continue;
            }

            debug!("Expiring cookie: {}", name);
            let host = &self.config.hostname;
            // Expire under every scope the cookie could have been set with:
            // path only, exact host, and dot-prefixed root domain.
            self.cookies
                .write(&format!("{name}=; expires={EPOCH_EXPIRY}; path=/"));
            self.cookies.write(&format!(
                "{name}=; expires={EPOCH_EXPIRY}; path=/; domain={host}"
            ));
            self.cookies.write(&format!(
                "{name}=; expires={EPOCH_EXPIRY}; path=/; domain=.{host}"
            ));
        }
    }

    fn purge_store(&self, store: &dyn KeyValueStore, lifetime: &str) {
        let keys = match store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Cannot enumerate {} storage: {}", lifetime, e);
                return;
            }
        };

        for key in keys {
            if self.config.storage_allowlist.iter().any(|keep| keep == &key) {
                continue;
            }
            debug!("Removing {} storage key: {}", lifetime, key);
            if let Err(e) = store.remove(&key) {
                warn!("Failed to remove {} storage key {}: {}", lifetime, key, e);
            }
        }
    }
}
