//! Meetly Core: configuration and error types for the consent service.

pub mod config;
pub mod error;

pub use config::{ConsentConfig, DataPaths, MeetlyConfig};
pub use error::{Error, Result};
