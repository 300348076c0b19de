//! Reddit public JSON endpoints (no OAuth).
//!
//! Listings are walked with the `after` fullname cursor, 100 items per page,
//! newest first. Reddit throttles anonymous clients by user agent, so a
//! descriptive one is mandatory.
pub mod client;
pub mod extract;
pub mod types;

pub use client::RedditApi;
