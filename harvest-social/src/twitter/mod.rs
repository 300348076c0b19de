//! Twitter/X v2 recent search.
//!
//! Recent search only reaches back seven days, so any configured window is
//! intersected with that range before the request is built. Pagination runs
//! on `meta.next_token`.
pub mod client;
pub mod extract;
pub mod types;

pub use client::{TwitterApi, build_query, recent_window};
pub use extract::AuthoredTweet;
