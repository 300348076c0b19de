//! Subset of the v2 recent-search payload that a tweet record is built from.
//! Request more `tweet.fields` in the client before adding fields here.
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub data: Vec<Tweet>,
    pub includes: Includes,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub next_token: Option<String>,
    pub result_count: u32,
}

/// Expansions; only `author_id` is requested.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Includes {
    pub users: Vec<Author>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub lang: String,
    /// Missing only if `created_at` was left out of `tweet.fields`.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub public_metrics: Counters,
    #[serde(default)]
    pub entities: Entities,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Counters {
    pub like_count: u64,
    #[serde(alias = "repost_count")]
    pub retweet_count: u64,
    pub reply_count: u64,
    pub quote_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Entities {
    pub hashtags: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub tag: String,
}
