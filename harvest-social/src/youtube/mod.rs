//! YouTube Data API v3 (`search.list`, `commentThreads.list`).
//!
//! Every call is authenticated with the API key as the `key` query
//! parameter. The default daily quota is 10,000 units and a single
//! `search.list` call costs 100 of them, so callers should keep the number
//! of searches small.
pub mod client;
pub mod extract;
pub mod types;

pub use client::{SearchQuery, YoutubeApi};

/// Units charged per `search.list` call.
pub const SEARCH_COST: u32 = 100;
/// Units charged per `commentThreads.list` call.
pub const COMMENT_THREADS_COST: u32 = 1;
pub const DAILY_QUOTA: u32 = 10_000;
