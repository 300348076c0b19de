//! Cursor-driven page walking shared by every collector.
//!
//! A [`Paginator`] turns a [`PageSource`] into a lazy stream of raw items.
//! Nothing is requested until the stream is polled, and the stream stops
//! requesting as soon as one of its stop conditions holds, in this order:
//! the source reports no next page, the item or walk cap is reached, or an
//! item older than the window start shows up. Items at or after the window
//! end are skipped without ending the walk, but still count as walked.
use crate::rate::RateLimiter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt, pin_mut};
use harvest_common::DateWindow;
use harvest_social::reddit::extract::epoch_to_utc;
use harvest_social::reddit::types::Post;
use harvest_social::telegram::ChannelMessage;
use harvest_social::twitter::AuthoredTweet;
use harvest_social::youtube::types::{CommentThread, SearchResult};
use harvest_social::{Page, SocialError};

/// Progress is logged every this many retained records.
pub const PROGRESS_EVERY: usize = 100;

#[async_trait]
pub trait PageSource: Send {
    type Item: Send;

    /// Fetch the page addressed by `cursor`; `None` asks for the first page.
    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<Self::Item>, SocialError>;
}

/// Creation time used for date-window checks.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageLimits {
    /// Raw items yielded before the stream ends.
    pub max_items: Option<usize>,
    /// Raw items looked at, including those skipped as newer than the window.
    pub max_walked: Option<usize>,
}

impl PageLimits {
    pub fn items(max_items: usize) -> Self {
        Self {
            max_items: Some(max_items),
            max_walked: None,
        }
    }

    /// Cap on how far back a listing is read, whatever the window keeps.
    pub fn walked(max_walked: usize) -> Self {
        Self {
            max_items: None,
            max_walked: Some(max_walked),
        }
    }

    fn exhausted(&self, yielded: usize, walked: usize) -> bool {
        self.max_items.is_some_and(|max| yielded >= max)
            || self.max_walked.is_some_and(|max| walked >= max)
    }
}

pub struct Paginator<S> {
    source: S,
    rate: RateLimiter,
    limits: PageLimits,
    window: Option<DateWindow>,
    label: String,
}

impl<S> Paginator<S>
where
    S: PageSource,
    S::Item: Timestamped,
{
    pub fn new(source: S, rate: RateLimiter) -> Self {
        Self {
            source,
            rate,
            limits: PageLimits::default(),
            window: None,
            label: String::new(),
        }
    }

    pub fn limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn window(mut self, window: Option<DateWindow>) -> Self {
        self.window = window;
        self
    }

    /// Name used in log events (subreddit, channel, query).
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<S::Item, SocialError>> {
        let Paginator {
            mut source,
            rate,
            limits,
            window,
            label,
        } = self;

        async_stream::try_stream! {
            let mut cursor: Option<String> = None;
            let mut yielded = 0usize;
            let mut walked = 0usize;
            let mut pages = 0usize;

            'pages: loop {
                if limits.exhausted(yielded, walked) {
                    break;
                }

                rate.acquire().await;
                let page = source.fetch_page(cursor.as_deref()).await?;
                pages += 1;
                tracing::debug!(
                    target: "pagination",
                    label = %label,
                    page = pages,
                    items = page.items.len(),
                    has_next = page.next.is_some(),
                    "page.fetched"
                );

                for item in page.items {
                    walked += 1;
                    if let Some(window) = &window {
                        let ts = item.timestamp();
                        if ts >= window.end {
                            if limits.exhausted(yielded, walked) {
                                tracing::debug!(target: "pagination", label = %label, walked, "page.walk_cap");
                                break 'pages;
                            }
                            continue;
                        }
                        if ts < window.start {
                            tracing::debug!(
                                target: "pagination",
                                label = %label,
                                boundary = %window.start,
                                "page.window_crossed"
                            );
                            break 'pages;
                        }
                    }
                    yield item;
                    yielded += 1;
                    if limits.exhausted(yielded, walked) {
                        break 'pages;
                    }
                }

                match page.next {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        }
    }
}

/// Pull items through `keep` until `cap` records are retained.
///
/// The stream is dropped as soon as the cap is met, so no further page is
/// requested. A cap of zero returns without polling at all.
pub async fn collect_retained<T, R, E, St, F>(
    stream: St,
    cap: Option<usize>,
    mut keep: F,
) -> Result<Vec<R>, E>
where
    St: Stream<Item = Result<T, E>>,
    F: FnMut(T) -> Option<R>,
{
    let mut out = Vec::new();
    if cap == Some(0) {
        return Ok(out);
    }
    pin_mut!(stream);
    while let Some(item) = stream.try_next().await? {
        let Some(record) = keep(item) else { continue };
        out.push(record);
        if out.len() % PROGRESS_EVERY == 0 {
            tracing::info!(target: "pagination", retained = out.len(), "collect.progress");
        }
        if cap.is_some_and(|cap| out.len() >= cap) {
            break;
        }
    }
    Ok(out)
}

impl Timestamped for Post {
    fn timestamp(&self) -> DateTime<Utc> {
        epoch_to_utc(self.created_utc)
    }
}

impl Timestamped for SearchResult {
    fn timestamp(&self) -> DateTime<Utc> {
        self.snippet.published_at
    }
}

impl Timestamped for CommentThread {
    fn timestamp(&self) -> DateTime<Utc> {
        self.snippet.top_level_comment.snippet.published_at
    }
}

impl Timestamped for AuthoredTweet {
    fn timestamp(&self) -> DateTime<Utc> {
        self.tweet.created_at.unwrap_or_default()
    }
}

impl Timestamped for ChannelMessage {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::StreamExt;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Item {
        pub id: u32,
        pub ts: DateTime<Utc>,
    }

    impl Timestamped for Item {
        fn timestamp(&self) -> DateTime<Utc> {
            self.ts
        }
    }

    /// Serves fixed pages and counts requests.
    pub(crate) struct FixedPages {
        pub pages: Vec<Vec<Item>>,
        pub requests: usize,
    }

    #[async_trait]
    impl<'a> PageSource for &'a mut FixedPages {
        type Item = Item;

        async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<Item>, SocialError> {
            self.requests += 1;
            let idx: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let items = self.pages.get(idx).cloned().unwrap_or_default();
            let next = (idx + 1 < self.pages.len()).then(|| (idx + 1).to_string());
            Ok(Page { items, next })
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()
    }

    fn pages_of(days: &[&[u32]]) -> FixedPages {
        let mut id = 0;
        FixedPages {
            pages: days
                .iter()
                .map(|page| {
                    page.iter()
                        .map(|d| {
                            id += 1;
                            Item { id, ts: day(*d) }
                        })
                        .collect()
                })
                .collect(),
            requests: 0,
        }
    }

    #[tokio::test]
    async fn walks_every_page_until_no_next() {
        let mut src = pages_of(&[&[9, 8], &[7, 6], &[5]]);
        let items: Vec<_> = Paginator::new(&mut src, RateLimiter::unlimited())
            .into_stream()
            .collect::<Vec<_>>()
            .await;
        assert_eq!(items.len(), 5);
        assert_eq!(src.requests, 3);
    }

    #[tokio::test]
    async fn item_cap_stops_requests() {
        let mut src = pages_of(&[&[9, 8], &[7, 6], &[5, 4]]);
        let stream = Paginator::new(&mut src, RateLimiter::unlimited())
            .limits(PageLimits::items(3))
            .into_stream();
        let ids: Vec<u32> = collect_retained(stream, None, |i: Item| Some(i.id))
            .await
            .unwrap();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(src.requests, 2);
    }

    #[tokio::test]
    async fn window_skips_newer_and_stops_at_older() {
        let mut src = pages_of(&[&[20, 15], &[10, 4], &[3, 2]]);
        let window = DateWindow::new(day(5), day(16)).unwrap();
        let stream = Paginator::new(&mut src, RateLimiter::unlimited())
            .window(Some(window))
            .into_stream();
        let days: Vec<u32> = collect_retained(stream, None, |i: Item| {
            Some(chrono::Datelike::day(&i.ts))
        })
        .await
        .unwrap();
        assert_eq!(days, [15, 10]);
        assert_eq!(src.requests, 2, "third page must not be requested");
    }

    #[tokio::test]
    async fn skipped_newer_items_count_toward_walk_cap() {
        // fifty pages past the window end before anything inside it
        let newer: &[u32] = &[20];
        let mut days = vec![newer; 50];
        days.push(&[10]);
        let mut src = pages_of(&days);
        let window = DateWindow::new(day(5), day(16)).unwrap();
        let stream = Paginator::new(&mut src, RateLimiter::unlimited())
            .limits(PageLimits::walked(3))
            .window(Some(window))
            .into_stream();
        let out: Vec<Item> = collect_retained(stream, None, Some).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(src.requests, 3);
    }

    #[tokio::test]
    async fn walk_cap_includes_yielded_items() {
        let mut src = pages_of(&[&[9, 8], &[7, 6], &[5, 4]]);
        let stream = Paginator::new(&mut src, RateLimiter::unlimited())
            .limits(PageLimits::walked(3))
            .into_stream();
        let ids: Vec<u32> = collect_retained(stream, None, |i: Item| Some(i.id))
            .await
            .unwrap();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(src.requests, 2);
    }

    #[tokio::test]
    async fn window_end_is_exclusive_to_the_millisecond() {
        let window = DateWindow::from_dates(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        )
        .unwrap();
        let last_second = Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap();
        let mut src = FixedPages {
            pages: vec![vec![
                Item { id: 1, ts: window.end },
                Item { id: 2, ts: last_second + chrono::Duration::milliseconds(999) },
                Item { id: 3, ts: window.start },
            ]],
            requests: 0,
        };
        let stream = Paginator::new(&mut src, RateLimiter::unlimited())
            .window(Some(window))
            .into_stream();
        let ids: Vec<u32> = collect_retained(stream, None, |i: Item| Some(i.id))
            .await
            .unwrap();
        assert_eq!(ids, [2, 3]);
    }

    #[tokio::test]
    async fn retained_cap_counts_kept_records_only() {
        let mut src = pages_of(&[&[1, 2, 3, 4], &[5, 6, 7, 8], &[9, 10, 11, 12]]);
        let stream = Paginator::new(&mut src, RateLimiter::unlimited()).into_stream();
        // keep even days only
        let ids: Vec<u32> = collect_retained(stream, Some(3), |i: Item| {
            (chrono::Datelike::day(&i.ts) % 2 == 0).then_some(i.id)
        })
        .await
        .unwrap();
        assert_eq!(ids, [2, 4, 6]);
        assert_eq!(src.requests, 2);
    }

    #[tokio::test]
    async fn zero_cap_makes_no_request() {
        let mut src = pages_of(&[&[1]]);
        let stream = Paginator::new(&mut src, RateLimiter::unlimited()).into_stream();
        let out: Vec<Item> = collect_retained(stream, Some(0), Some).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(src.requests, 0);
    }

    struct Failing;

    #[async_trait]
    impl PageSource for Failing {
        type Item = Item;

        async fn fetch_page(&mut self, _cursor: Option<&str>) -> Result<Page<Item>, SocialError> {
            Err(SocialError::Telegram("boom".into()))
        }
    }

    #[tokio::test]
    async fn source_error_ends_collection() {
        let stream = Paginator::new(Failing, RateLimiter::unlimited()).into_stream();
        let err = collect_retained(stream, None, |i: Item| Some(i)).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn pages_are_paced_by_rate_limiter() {
        let mut src = pages_of(&[&[9], &[8], &[7]]);
        let t0 = tokio::time::Instant::now();
        let stream = Paginator::new(
            &mut src,
            RateLimiter::per_interval(std::time::Duration::from_secs(1)),
        )
        .into_stream();
        let out: Vec<Item> = collect_retained(stream, None, Some).await.unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(t0.elapsed(), std::time::Duration::from_secs(2));
    }
}
