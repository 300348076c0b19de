//! Social network clients and extractors used by the collectors.
//!
//! One module per platform. The HTTP platforms are split the same way:
//! `client` issues the requests, `types` mirrors the wire format, `extract`
//! turns wire items into the flat records of `harvest-common`. Telegram sits
//! behind a trait so the MTProto client can be left out of the build.
//!
//! Clients return one page per call together with the cursor for the next
//! page; walking pages, pacing requests and filtering are left to
//! `harvest-pipeline`.
pub mod error;
pub mod reddit;
pub mod telegram;
pub mod twitter;
pub mod youtube;

pub use error::SocialError;

/// One page of raw items plus the cursor for the following page.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` once the API reports no further pages.
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}
