use crate::youtube::types::{CommentThread, SearchResult};
use harvest_common::YoutubeComment;

/// Join a comment thread with the video it belongs to.
///
/// `channel_name` is the configured display name of the channel rather than
/// the API's `channelTitle`, so output rows group the way the config reads.
pub fn comment_record(
    video: &SearchResult,
    thread: &CommentThread,
    channel_name: &str,
    keyword: &str,
) -> YoutubeComment {
    let top = &thread.snippet.top_level_comment;
    YoutubeComment {
        video_id: video.id.video_id.clone().unwrap_or_default(),
        channel_name: channel_name.to_string(),
        video_title: video.snippet.title.clone(),
        published_date: video.snippet.published_at,
        description: video.snippet.description.clone(),
        comment_id: thread.id.clone(),
        comment_text: top.snippet.text_display.clone(),
        comment_author: top.snippet.author_display_name.clone(),
        comment_date: top.snippet.published_at,
        like_count: top.snippet.like_count,
        reply_count: thread.snippet.total_reply_count,
        keyword: keyword.to_string(),
    }
}
