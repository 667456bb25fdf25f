//! Cookie jar: `document.cookie`-style read/write over one origin's cookies.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

/// Read/write surface over the ambient cookies of an origin.
pub trait CookieJar: Send + Sync {
    /// Full cookie header for the origin: `name=value` pairs joined by `; `.
    fn cookie_header(&self) -> String;

    /// Apply one cookie assignment string, e.g.
    /// `theme=dark; path=/; domain=.meetly.example`.
    ///
    /// An `expires` attribute in the past deletes the cookie whose name and
    /// domain scope match the assignment. Malformed assignments are ignored.
    fn write(&self, assignment: &str);
}

/// A cookie as stored in the jar. Cookies are keyed by name plus the domain
/// attribute they were set with (`None` for host-only cookies); path
/// attributes are accepted but not used for scoping.
#[derive(Debug, Clone)]
struct StoredCookie {
    value: String,
}

/// In-memory jar for a single origin.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: RwLock<BTreeMap<(String, Option<String>), StoredCookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a host-only cookie, as a `Set-Cookie` header without attributes
    /// would.
    pub fn set(&self, name: &str, value: &str) {
        self.write(&format!("{name}={value}"));
    }

    /// Set a cookie scoped to a domain attribute.
    pub fn set_with_domain(&self, name: &str, value: &str, domain: &str) {
        self.write(&format!("{name}={value}; domain={domain}"));
    }

    /// Value of the first cookie with this name, any domain scope.
    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .read()
            .iter()
            .find(|((n, _), _)| n == name)
            .map(|(_, c)| c.value.clone())
    }

    pub fn len(&self) -> usize {
        self.cookies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.read().is_empty()
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookie_header(&self) -> String {
        self.cookies
            .read()
            .iter()
            .map(|((name, _), cookie)| format!("{}={}", name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn write(&self, assignment: &str) {
        let mut parts = assignment.split(';');
        let pair = match parts.next() {
            Some(pair) => pair,
            None => return,
        };
        let (name, value) = match pair.split_once('=') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => return,
        };
        if name.is_empty() {
            return;
        }

        let mut domain: Option<String> = None;
        let mut expired = false;

        for attr in parts {
            match attr.trim().split_once('=') {
                Some((key, val)) if key.eq_ignore_ascii_case("domain") => {
                    domain = Some(val.trim().to_string());
                }
                Some((key, val)) if key.eq_ignore_ascii_case("expires") => {
                    expired = chrono::DateTime::parse_from_rfc2822(val.trim())
                        .map(|t| t.with_timezone(&chrono::Utc) <= chrono::Utc::now())
                        .unwrap_or(false);
                }
                _ => {}
            }
        }

        let key = (name.to_string(), domain);
        let mut cookies = self.cookies.write();
        if expired {
            if cookies.remove(&key).is_some() {
                debug!("Cookie expired: {}", name);
            }
        } else {
            cookies.insert(
                key,
                StoredCookie {
                    value: value.to_string(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAST: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

    #[test]
    fn test_set_and_read_header() {
        let jar = MemoryCookieJar::new();
        jar.set("session_id", "abc");
        jar.set("theme", "dark");
        assert_eq!(jar.cookie_header(), "session_id=abc; theme=dark");
    }

    #[test]
    fn test_past_expiry_deletes_host_cookie() {
        let jar = MemoryCookieJar::new();
        jar.set("tracker", "1");
        jar.write(&format!("tracker=; expires={PAST}; path=/"));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_expiry_respects_domain_scope() {
        let jar = MemoryCookieJar::new();
        jar.set_with_domain("tracker", "1", ".meetly.example");

        // Host-scoped expiry does not touch the domain cookie.
        jar.write(&format!("tracker=; expires={PAST}; path=/"));
        assert_eq!(jar.len(), 1);

        jar.write(&format!(
            "tracker=; expires={PAST}; path=/; domain=.meetly.example"
        ));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_future_expiry_keeps_cookie() {
        let jar = MemoryCookieJar::new();
        jar.write("promo=visible; expires=Fri, 01 Jan 2100 00:00:00 GMT");
        assert_eq!(jar.get("promo").as_deref(), Some("visible"));
    }

    #[test]
    fn test_malformed_assignment_ignored() {
        let jar = MemoryCookieJar::new();
        jar.write("no-equals-sign");
        jar.write("=orphan-value");
        assert!(jar.is_empty());
    }

    #[test]
    fn test_overwrite_same_name() {
        let jar = MemoryCookieJar::new();
        jar.set("theme", "dark");
        jar.set("theme", "light");
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get("theme").as_deref(), Some("light"));
    }
}
