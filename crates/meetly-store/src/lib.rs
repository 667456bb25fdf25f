//! Meetly Store: the browser-side storage surfaces (key-value stores, cookie jar).

pub mod cookies;
pub mod kv;

pub use cookies::{CookieJar, MemoryCookieJar};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
