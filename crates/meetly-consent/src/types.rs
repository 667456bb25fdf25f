//! Consent record and category types.

use serde::{Deserialize, Serialize};

/// Schema version stamped into every persisted record.
pub const CONSENT_VERSION: &str = "1.0";

/// Cookie/storage categories a visitor can approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentCategory {
    Necessary,
    Analytics,
    Marketing,
    Functional,
}

impl ConsentCategory {
    pub fn all() -> &'static [ConsentCategory] {
        &[
            Self::Necessary,
            Self::Analytics,
            Self::Marketing,
            Self::Functional,
        ]
    }

    /// Categories the visitor can toggle; necessary is always granted.
    pub fn optional() -> &'static [ConsentCategory] {
        &[Self::Analytics, Self::Marketing, Self::Functional]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Necessary => "necessary",
            Self::Analytics => "analytics",
            Self::Marketing => "marketing",
            Self::Functional => "functional",
        }
    }
}

impl std::fmt::Display for ConsentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The persisted consent decision. Stored as the sole JSON value under the
/// configured storage key and fully replaced on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub necessary: bool,
    pub analytics: bool,
    pub marketing: bool,
    pub functional: bool,
    /// RFC 3339 timestamp of the decision.
    pub timestamp: String,
    pub version: String,
}

impl ConsentRecord {
    /// Build a record with the given optional-category flags, stamped now.
    /// `necessary` is always true.
    pub fn new(analytics: bool, marketing: bool, functional: bool) -> Self {
        Self {
            necessary: true,
            analytics,
            marketing,
            functional,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: CONSENT_VERSION.to_string(),
        }
    }

    pub fn accept_all() -> Self {
        Self::new(true, true, true)
    }

    pub fn decline_all() -> Self {
        Self::new(false, false, false)
    }

    pub fn is_enabled(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => self.necessary,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Marketing => self.marketing,
            ConsentCategory::Functional => self.functional,
        }
    }

    /// Categories currently granted, necessary included.
    pub fn enabled_categories(&self) -> Vec<ConsentCategory> {
        ConsentCategory::all()
            .iter()
            .copied()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    pub fn any_optional_enabled(&self) -> bool {
        ConsentCategory::optional()
            .iter()
            .any(|c| self.is_enabled(*c))
    }

    pub fn any_optional_disabled(&self) -> bool {
        ConsentCategory::optional()
            .iter()
            .any(|c| !self.is_enabled(*c))
    }
}

/// Partial update to the optional categories; absent fields keep their
/// current value.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PreferenceUpdate {
    pub analytics: Option<bool>,
    pub marketing: Option<bool>,
    pub functional: Option<bool>,
}

/// Terminal outcome of a visitor decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentOutcome {
    Accepted,
    Declined,
}

/// UI-layer notifications emitted by the consent manager.
///
/// `on_category_enabled` fires once per granted category when a decision is
/// adopted, at startup or after an accept/save, so the embedding layer can
/// activate the matching integrations. Exactly one of `on_accept` /
/// `on_decline` fires per visitor decision, never on startup.
pub trait ConsentEvents: Send + Sync {
    fn on_accept(&self) {}
    fn on_decline(&self) {}
    fn on_category_enabled(&self, category: ConsentCategory) {
        let _ = category;
    }
}
