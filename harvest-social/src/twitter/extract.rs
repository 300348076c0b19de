use crate::twitter::types::{SearchResponse, Tweet};
use harvest_common::TweetRecord;
use std::collections::HashMap;

/// A tweet with its author handle resolved from `includes.users`.
#[derive(Debug, Clone)]
pub struct AuthoredTweet {
    pub tweet: Tweet,
    pub username: Option<String>,
}

/// Split a search page into tweets joined with their authors.
pub fn authored_tweets(resp: SearchResponse) -> Vec<AuthoredTweet> {
    let handles: HashMap<String, String> = resp
        .includes
        .users
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();
    resp.data
        .into_iter()
        .map(|tweet| {
            let username = tweet
                .author_id
                .as_ref()
                .and_then(|id| handles.get(id))
                .cloned();
            AuthoredTweet { tweet, username }
        })
        .collect()
}

pub fn tweet_record(item: &AuthoredTweet, keyword: &str) -> TweetRecord {
    let tweet = &item.tweet;
    let counts = tweet.public_metrics;
    let hashtags = tweet
        .entities
        .hashtags
        .iter()
        .map(|h| h.tag.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    TweetRecord {
        tweet_id: tweet.id.clone(),
        date: tweet.created_at.unwrap_or_default(),
        username: item.username.clone().unwrap_or_default(),
        text: tweet.text.clone(),
        retweet_count: counts.retweet_count,
        like_count: counts.like_count,
        reply_count: counts.reply_count,
        quote_count: counts.quote_count,
        language: tweet.lang.clone(),
        hashtags,
        url: make_status_url(item.username.as_deref(), &tweet.id),
        keyword: keyword.to_string(),
    }
}

/// Canonical X status URL if we know the handle; otherwise /i/web/status/{id}.
pub fn make_status_url(handle: Option<&str>, id: &str) -> String {
    match handle {
        Some(h) => format!("https://x.com/{}/status/{}", h, id),
        None => format!("https://x.com/i/web/status/{}", id),
    }
}
