//! Feed subscription management for the news app.
//!
//! Operators list, add, enable/disable and delete the RSS feeds the rest of
//! the pipeline polls. [`storage::FeedRepository`] is the storage contract;
//! [`api`] exposes it over HTTP.

pub mod api;
pub mod config;
pub mod logging;
pub mod storage;
pub mod util;
