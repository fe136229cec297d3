//! Shared types for podcast analytics.
//!
//! Log and result models, the error type, user-agent classification, time
//! handling and command-line settings used by the data and binary crates.

pub mod error;
pub mod models;
pub mod settings;
pub mod time_utils;
pub mod user_agent;

pub use error::{AnalyticsError, Result};
