//! Common types shared across the harvest crates.
//!
//! This crate defines the record model written by every collector, the
//! platform enum, the collection date window and the observability helpers.
//! It stays dependency-light so the HTTP, social and pipeline crates can all
//! depend on it.
//!
//! # Overview
//!
//! - [`Record`]: flat, serializable output row with a canonical column list
//! - [`Platform`]: which service a record came from
//! - [`DateWindow`]: half-open UTC collection window over whole days
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use harvest_common::DateWindow;
//!
//! let window = DateWindow::from_dates(
//!     NaiveDate::from_ymd_opt(2023, 10, 7).unwrap(),
//!     NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
//! )
//! .unwrap();
//! assert_eq!(window.start.to_rfc3339(), "2023-10-07T00:00:00+00:00");
//! assert_eq!(window.end.to_rfc3339(), "2025-01-21T00:00:00+00:00");
//! ```
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod observability;
pub mod record;

pub use record::{
    RedditComment, RedditPost, Record, TelegramMessage, TweetRecord, YoutubeComment,
};

/// Service a collector talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Reddit,
    Youtube,
    Telegram,
    Twitter,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Reddit,
        Platform::Youtube,
        Platform::Telegram,
        Platform::Twitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::Youtube => "youtube",
            Platform::Telegram => "telegram",
            Platform::Twitter => "twitter",
        }
    }

    /// Human readable name used in logs and the setup plan.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Reddit => "Reddit",
            Platform::Youtube => "YouTube",
            Platform::Telegram => "Telegram",
            Platform::Twitter => "Twitter/X",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid date window: end ({end}) precedes start ({start})")]
pub struct InvalidWindow {
    pub start: String,
    pub end: String,
}

/// Half-open `[start, end)` collection window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidWindow> {
        if end < start {
            return Err(InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Whole days: from `start` 00:00 up to, not including, 00:00 of the
    /// day after `end`, so sub-second timestamps late on `end` still count.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidWindow> {
        let end = end
            .succ_opt()
            .map(|next| next.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(start.and_time(NaiveTime::MIN).and_utc(), end)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}
