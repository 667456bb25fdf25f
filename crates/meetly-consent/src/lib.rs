//! Meetly Consent: the visitor's consent decision and its enforcement.
//!
//! One persisted record captures which cookie/storage categories the visitor
//! approved. The manager owns that record and the banner-visibility flag;
//! the sanitizer deletes browser-side state the application no longer has
//! consent to retain.

pub mod manager;
pub mod sanitizer;
pub mod types;

pub use manager::{ConsentManager, ConsentPreferences};
pub use sanitizer::StorageSanitizer;
pub use types::{
    ConsentCategory, ConsentEvents, ConsentOutcome, ConsentRecord, PreferenceUpdate,
    CONSENT_VERSION,
};
