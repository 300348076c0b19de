use crate::reddit::types::{Comment, Listing, Post};
use chrono::{DateTime, Utc};
use harvest_common::{RedditComment, RedditPost};

const DELETED: &str = "[deleted]";

/// Reddit timestamps are fractional epoch seconds.
pub fn epoch_to_utc(secs: f64) -> DateTime<Utc> {
    let whole = secs.trunc() as i64;
    let nanos = ((secs.fract() * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole, nanos).unwrap_or_default()
}

/// Title and self text, the haystack for keyword matching.
pub fn search_text(post: &Post) -> String {
    if post.selftext.is_empty() {
        post.title.clone()
    } else {
        format!("{}\n{}", post.title, post.selftext)
    }
}

pub fn post_record(post: &Post, keyword: &str) -> RedditPost {
    RedditPost {
        post_id: post.id.clone(),
        subreddit: post.subreddit.clone(),
        author: author_or_deleted(post.author.as_deref()),
        date: epoch_to_utc(post.created_utc),
        title: post.title.clone(),
        text: post.selftext.clone(),
        score: post.score,
        num_comments: post.num_comments,
        upvote_ratio: post.upvote_ratio,
        keyword: keyword.to_string(),
        url: post.url.clone().unwrap_or_default(),
        permalink: format!("https://reddit.com{}", post.permalink),
        is_self: post.is_self,
    }
}

pub fn comment_record(comment: &Comment, post_id: &str) -> RedditComment {
    RedditComment {
        comment_id: comment.id.clone(),
        post_id: post_id.to_string(),
        author: author_or_deleted(comment.author.as_deref()),
        date: epoch_to_utc(comment.created_utc),
        text: comment.body.clone(),
        score: comment.score,
        is_submitter: comment.is_submitter,
        parent_id: comment.parent_id.clone(),
    }
}

/// Depth-first walk of a comment listing. `more` stubs are dropped since
/// expanding them costs one request each.
pub fn flatten_comments(listing: Listing<serde_json::Value>, out: &mut Vec<Comment>) {
    for thing in listing.data.children {
        if thing.kind != "t1" {
            continue;
        }
        let mut comment: Comment = match serde_json::from_value(thing.data) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(target: "reddit", error = %e, "skipping malformed comment");
                continue;
            }
        };
        let replies = std::mem::take(&mut comment.replies);
        out.push(comment);
        if replies.is_object() {
            if let Ok(nested) = serde_json::from_value::<Listing<serde_json::Value>>(replies) {
                flatten_comments(nested, out);
            }
        }
    }
}

fn author_or_deleted(author: Option<&str>) -> String {
    match author {
        Some(a) if !a.is_empty() => a.to_string(),
        _ => DELETED.to_string(),
    }
}
