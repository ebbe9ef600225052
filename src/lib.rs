//! playstv-recovery - recover plays.tv profile videos from the Wayback Machine.
//!
//! Discovers every video the archive still knows about for a profile through
//! the site's paginated listing endpoints, resolves each one to a direct
//! media URL and streams it to disk, all behind a shared sliding-window rate
//! limiter.

pub mod archive;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod http_client;
pub mod models;
pub mod rate_limit;
pub mod services;
pub mod utils;
