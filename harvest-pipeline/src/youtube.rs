//! Channel-scoped video search followed by top-level comment threads.
//!
//! Each configured channel is searched once per keyword (or once without a
//! query when no keywords are set) until the channel's video cap is met.
//! Comments of every found video are then paged up to the per-video cap.
use crate::context::RunContext;
use crate::error::CollectError;
use crate::filter::{AllowList, ItemFilter};
use crate::pagination::{PageLimits, PageSource, Paginator, collect_retained};
use crate::summary::PlatformRun;
use async_trait::async_trait;
use harvest_common::{Platform, YoutubeComment};
use harvest_config::{YoutubeConfig, resolved_secret};
use harvest_social::youtube::client::{MAX_COMMENT_RESULTS, MAX_SEARCH_RESULTS};
use harvest_social::youtube::extract::comment_record;
use harvest_social::youtube::types::{CommentThread, SearchResult};
use harvest_social::youtube::{COMMENT_THREADS_COST, DAILY_QUOTA, SEARCH_COST, SearchQuery, YoutubeApi};
use harvest_social::{Page, SocialError};
use std::collections::HashSet;

struct VideoSearch<'a> {
    api: &'a YoutubeApi,
    query: SearchQuery,
}

#[async_trait]
impl PageSource for VideoSearch<'_> {
    type Item = SearchResult;

    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<SearchResult>, SocialError> {
        self.api.search_videos(&self.query, cursor).await
    }
}

struct CommentPages<'a> {
    api: &'a YoutubeApi,
    video_id: &'a str,
    page_size: u32,
}

#[async_trait]
impl PageSource for CommentPages<'_> {
    type Item = CommentThread;

    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<CommentThread>, SocialError> {
        self.api
            .comment_threads(self.video_id, cursor, self.page_size)
            .await
    }
}

/// Rough unit cost of a run, assuming one search page per channel and query
/// and one comment page per hundred comments.
/// Saturates at `u64::MAX` for absurd caps.
pub fn estimated_quota(cfg: &YoutubeConfig) -> u64 {
    let wide = |n: usize| u64::try_from(n).unwrap_or(u64::MAX);
    let queries = wide(cfg.keywords.iter().filter(|k| !k.trim().is_empty()).count().max(1));
    let channels = wide(cfg.channels.len());
    let searches = channels.saturating_mul(queries);
    let videos = channels.saturating_mul(wide(cfg.max_videos_per_channel));
    let comment_pages = wide(cfg.max_comments_per_video).div_ceil(u64::from(MAX_COMMENT_RESULTS));
    searches
        .saturating_mul(u64::from(SEARCH_COST))
        .saturating_add(
            videos
                .saturating_mul(comment_pages)
                .saturating_mul(u64::from(COMMENT_THREADS_COST)),
        )
}

pub async fn collect_youtube(
    api: &YoutubeApi,
    cfg: &YoutubeConfig,
    ctx: &RunContext,
) -> Result<Vec<YoutubeComment>, CollectError> {
    let estimate = estimated_quota(cfg);
    if estimate > u64::from(DAILY_QUOTA) {
        tracing::warn!(target: "youtube", estimate, quota = DAILY_QUOTA, "youtube.quota.estimate_exceeds_daily");
    } else {
        tracing::info!(target: "youtube", estimate, quota = DAILY_QUOTA, "youtube.quota.estimate");
    }

    let channels = ItemFilter::allow_only(AllowList::new(cfg.channels.iter().map(|c| &c.id)));
    let queries: Vec<&str> = {
        let q: Vec<&str> = cfg
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        if q.is_empty() { vec![""] } else { q }
    };

    let mut records = Vec::new();
    for channel in &cfg.channels {
        let mut seen: HashSet<String> = HashSet::new();
        let mut videos: Vec<(SearchResult, &str)> = Vec::new();

        for query in &queries {
            let remaining = cfg.max_videos_per_channel.saturating_sub(videos.len());
            if remaining == 0 {
                break;
            }
            let source = VideoSearch {
                api,
                query: SearchQuery {
                    channel_id: channel.id.clone(),
                    query: query.to_string(),
                    published_after: Some(ctx.window.start),
                    published_before: Some(ctx.window.end),
                    max_results: u32::try_from(remaining)
                        .unwrap_or(u32::MAX)
                        .min(MAX_SEARCH_RESULTS),
                },
            };
            let stream = Paginator::new(source, ctx.rate.clone())
                .limits(PageLimits::items(remaining))
                .window(Some(ctx.window))
                .label(format!("{}?q={}", channel.name, query))
                .into_stream();
            let found = collect_retained(stream, Some(remaining), |video: SearchResult| {
                let id = video.id.video_id.clone()?;
                channels.check(&video.snippet.channel_id, "")?;
                seen.insert(id).then_some(video)
            })
            .await?;
            videos.extend(found.into_iter().map(|v| (v, *query)));
        }
        tracing::info!(target: "youtube", channel = %channel.name, videos = videos.len(), "youtube.channel.videos");

        for (video, keyword) in &videos {
            let Some(video_id) = video.id.video_id.as_deref() else {
                continue;
            };
            let source = CommentPages {
                api,
                video_id,
                page_size: MAX_COMMENT_RESULTS,
            };
            let stream = Paginator::new(source, ctx.rate.clone())
                .limits(PageLimits::items(cfg.max_comments_per_video))
                .label(video_id)
                .into_stream();
            let result = collect_retained(stream, Some(cfg.max_comments_per_video), |thread: CommentThread| {
                Some(comment_record(video, &thread, &channel.name, keyword))
            })
            .await;
            match result {
                Ok(comments) => {
                    tracing::info!(target: "youtube", video_id, comments = comments.len(), "youtube.video.comments");
                    records.extend(comments);
                }
                Err(err) if !err.is_fatal() => {
                    tracing::warn!(target: "youtube", video_id, error = %err, "youtube.video.skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
    Ok(ctx.dedupe(records))
}

pub async fn run_youtube(cfg: &YoutubeConfig, ctx: &RunContext) -> Result<PlatformRun, CollectError> {
    let key = resolved_secret(&cfg.api_key)
        .ok_or_else(|| SocialError::missing_credential(Platform::Youtube, "youtube.api_key (YOUTUBE_API_KEY)"))?;
    let api = YoutubeApi::new(ctx.http_client(&cfg.base_url, None)?, key)?;
    let records = collect_youtube(&api, cfg, ctx).await?;

    let files = ctx.write_output(&ctx.stem(Platform::Youtube), &records)?;
    Ok(PlatformRun::ok(Platform::Youtube, records.len(), files))
}
