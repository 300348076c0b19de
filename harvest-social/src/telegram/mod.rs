//! Telegram channel history over MTProto.
//!
//! The collector talks to [`TelegramApi`]; the real client lives in
//! [`mtproto`] and is only compiled with the `mtproto` feature. History is
//! read newest first in pages keyed by message id: each page asks for
//! messages strictly older than the smallest id of the previous one.
use crate::{Page, SocialError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harvest_common::TelegramMessage;

#[cfg(feature = "mtproto")]
pub mod mtproto;

/// The largest history slice one `messages.getHistory` call returns.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A message as read from a channel, before it becomes a record.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub text: String,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub replies: Option<i64>,
    pub has_media: bool,
}

/// A channel resolved from its public username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    /// Username as the server reports it, not as requested.
    pub username: String,
    /// Opaque handle the backend needs to address the channel again.
    pub handle: String,
}

#[async_trait]
pub trait TelegramApi: Send {
    /// Look a channel up by username. Unknown names are `NotFound`.
    async fn resolve_channel(&mut self, username: &str) -> Result<ResolvedChannel, SocialError>;

    /// Up to `limit` messages older than `before_id` (newest first), or the
    /// latest ones when `before_id` is `None`.
    async fn history(
        &mut self,
        channel: &ResolvedChannel,
        before_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ChannelMessage>, SocialError>;
}

/// Fetch one history page and derive the cursor for the next one.
///
/// A short page means the start of the channel was reached.
pub async fn history_page<A: TelegramApi + ?Sized>(
    api: &mut A,
    channel: &ResolvedChannel,
    cursor: Option<&str>,
    limit: u32,
) -> Result<Page<ChannelMessage>, SocialError> {
    let before_id = match cursor {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| SocialError::Telegram(format!("bad history cursor {raw:?}")))?,
        ),
        None => None,
    };
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let items = api.history(channel, before_id, limit).await?;

    let next = if items.len() < limit as usize {
        None
    } else {
        items.iter().map(|m| m.id).min().map(|id| id.to_string())
    };
    tracing::debug!(
        target: "telegram",
        channel = %channel.username,
        items = items.len(),
        next = ?next,
        "telegram.page"
    );
    Ok(Page { items, next })
}

pub fn message_link(channel: &str, id: i64) -> String {
    format!("https://t.me/{}/{}", channel, id)
}

pub fn message_record(channel: &str, msg: &ChannelMessage) -> TelegramMessage {
    TelegramMessage {
        channel: channel.to_string(),
        message_id: msg.id,
        date: msg.date,
        text: msg.text.clone(),
        views: msg.views,
        forwards: msg.forwards,
        replies: msg.replies.unwrap_or(0),
        link: message_link(channel, msg.id),
        has_media: msg.has_media,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Scripted {
        ids: Vec<i64>,
        calls: Vec<Option<i64>>,
    }

    #[async_trait]
    impl TelegramApi for Scripted {
        async fn resolve_channel(&mut self, username: &str) -> Result<ResolvedChannel, SocialError> {
            Ok(ResolvedChannel {
                username: username.into(),
                handle: "1".into(),
            })
        }

        async fn history(
            &mut self,
            _channel: &ResolvedChannel,
            before_id: Option<i64>,
            limit: u32,
        ) -> Result<Vec<ChannelMessage>, SocialError> {
            self.calls.push(before_id);
            Ok(self
                .ids
                .iter()
                .copied()
                .filter(|id| before_id.is_none_or(|b| *id < b))
                .take(limit as usize)
                .map(|id| ChannelMessage {
                    id,
                    date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                    text: format!("m{id}"),
                    views: None,
                    forwards: None,
                    replies: None,
                    has_media: false,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn cursor_walks_back_by_smallest_id() {
        let mut api = Scripted {
            ids: vec![5, 4, 3, 2, 1],
            calls: vec![],
        };
        let chan = api.resolve_channel("GazaNow").await.unwrap();

        let first = history_page(&mut api, &chan, None, 2).await.unwrap();
        assert_eq!(first.next.as_deref(), Some("4"));
        let second = history_page(&mut api, &chan, first.next.as_deref(), 2).await.unwrap();
        assert_eq!(second.next.as_deref(), Some("2"));
        let third = history_page(&mut api, &chan, second.next.as_deref(), 2).await.unwrap();
        assert_eq!(third.items.len(), 1);
        assert_eq!(third.next, None);
        assert_eq!(api.calls, vec![None, Some(4), Some(2)]);
    }

    #[test]
    fn record_links_to_public_message() {
        let msg = ChannelMessage {
            id: 77,
            date: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            text: "update".into(),
            views: Some(1200),
            forwards: None,
            replies: None,
            has_media: true,
        };
        let rec = message_record("GazaNow", &msg);
        assert_eq!(rec.link, "https://t.me/GazaNow/77");
        assert_eq!(rec.replies, 0);
        assert_eq!(rec.views, Some(1200));
    }
}
