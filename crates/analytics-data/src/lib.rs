//! Access-log processing for podcast analytics.
//!
//! Decodes percent-encoded JSON access logs, normalizes and filters the
//! records, counts daily streams and listeners per client category and
//! writes the result as JSON.

pub mod aggregator;
pub mod emitter;
pub mod filter;
pub mod normalizer;
pub mod pipeline;
pub mod reader;

pub use analytics_core as core;
