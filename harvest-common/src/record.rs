//! Flat output records, one struct per collected item kind.
//!
//! Field order in each struct is the column order of the CSV output and the
//! key order of the JSON objects; `FIELDS` repeats it so an empty run can
//! still emit a header row.
use crate::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized item ready to be written to disk.
pub trait Record: Serialize {
    const PLATFORM: Platform;
    /// Canonical column list, in serialization order.
    const FIELDS: &'static [&'static str];

    fn id(&self) -> String;
    fn timestamp(&self) -> DateTime<Utc>;
    /// Subreddit, channel or keyword bucket the item was collected from.
    fn source(&self) -> &str;
    fn author(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditPost {
    pub post_id: String,
    pub subreddit: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub title: String,
    pub text: String,
    pub score: i64,
    pub num_comments: u64,
    pub upvote_ratio: f64,
    pub keyword: String,
    pub url: String,
    pub permalink: String,
    pub is_self: bool,
}

impl Record for RedditPost {
    const PLATFORM: Platform = Platform::Reddit;
    const FIELDS: &'static [&'static str] = &[
        "post_id",
        "subreddit",
        "author",
        "date",
        "title",
        "text",
        "score",
        "num_comments",
        "upvote_ratio",
        "keyword",
        "url",
        "permalink",
        "is_self",
    ];

    fn id(&self) -> String {
        self.post_id.clone()
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
    fn source(&self) -> &str {
        &self.subreddit
    }
    fn author(&self) -> Option<&str> {
        Some(&self.author)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditComment {
    pub comment_id: String,
    pub post_id: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub text: String,
    pub score: i64,
    pub is_submitter: bool,
    pub parent_id: String,
}

impl Record for RedditComment {
    const PLATFORM: Platform = Platform::Reddit;
    const FIELDS: &'static [&'static str] = &[
        "comment_id",
        "post_id",
        "author",
        "date",
        "text",
        "score",
        "is_submitter",
        "parent_id",
    ];

    fn id(&self) -> String {
        self.comment_id.clone()
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
    fn source(&self) -> &str {
        &self.post_id
    }
    fn author(&self) -> Option<&str> {
        Some(&self.author)
    }
}

/// One top-level comment joined with the metadata of its video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoutubeComment {
    pub video_id: String,
    pub channel_name: String,
    pub video_title: String,
    pub published_date: DateTime<Utc>,
    pub description: String,
    pub comment_id: String,
    pub comment_text: String,
    pub comment_author: String,
    pub comment_date: DateTime<Utc>,
    pub like_count: u64,
    pub reply_count: u64,
    pub keyword: String,
}

impl Record for YoutubeComment {
    const PLATFORM: Platform = Platform::Youtube;
    const FIELDS: &'static [&'static str] = &[
        "video_id",
        "channel_name",
        "video_title",
        "published_date",
        "description",
        "comment_id",
        "comment_text",
        "comment_author",
        "comment_date",
        "like_count",
        "reply_count",
        "keyword",
    ];

    fn id(&self) -> String {
        self.comment_id.clone()
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.comment_date
    }
    fn source(&self) -> &str {
        &self.channel_name
    }
    fn author(&self) -> Option<&str> {
        Some(&self.comment_author)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub channel: String,
    pub message_id: i64,
    pub date: DateTime<Utc>,
    pub text: String,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub replies: i64,
    pub link: String,
    pub has_media: bool,
}

impl Record for TelegramMessage {
    const PLATFORM: Platform = Platform::Telegram;
    const FIELDS: &'static [&'static str] = &[
        "channel",
        "message_id",
        "date",
        "text",
        "views",
        "forwards",
        "replies",
        "link",
        "has_media",
    ];

    fn id(&self) -> String {
        // message ids are only unique per channel
        format!("{}/{}", self.channel, self.message_id)
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
    fn source(&self) -> &str {
        &self.channel
    }
    fn author(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetRecord {
    pub tweet_id: String,
    pub date: DateTime<Utc>,
    pub username: String,
    pub text: String,
    pub retweet_count: u64,
    pub like_count: u64,
    pub reply_count: u64,
    pub quote_count: u64,
    pub language: String,
    /// Space separated, without the leading `#`.
    pub hashtags: String,
    pub url: String,
    pub keyword: String,
}

impl Record for TweetRecord {
    const PLATFORM: Platform = Platform::Twitter;
    const FIELDS: &'static [&'static str] = &[
        "tweet_id",
        "date",
        "username",
        "text",
        "retweet_count",
        "like_count",
        "reply_count",
        "quote_count",
        "language",
        "hashtags",
        "url",
        "keyword",
    ];

    fn id(&self) -> String {
        self.tweet_id.clone()
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
    fn source(&self) -> &str {
        &self.keyword
    }
    fn author(&self) -> Option<&str> {
        Some(&self.username)
    }
}
