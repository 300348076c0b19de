//! Recent-search collection, one query per keyword.
//!
//! The recent endpoint only reaches seven days back, so the configured
//! window is first narrowed to what the API accepts. When nothing of it is
//! reachable the run returns no tweets instead of failing.
use crate::context::RunContext;
use crate::error::CollectError;
use crate::pagination::{PageLimits, PageSource, Paginator, collect_retained};
use crate::summary::PlatformRun;
use async_trait::async_trait;
use harvest_common::{Platform, TweetRecord};
use harvest_config::{TwitterConfig, resolved_secret};
use harvest_social::twitter::extract::tweet_record;
use harvest_social::twitter::{AuthoredTweet, TwitterApi, build_query, recent_window};
use harvest_social::{Page, SocialError};
use time::OffsetDateTime;

const MAX_RESULTS: u32 = 100;

struct RecentSearch<'a> {
    api: &'a TwitterApi,
    query: String,
    window: (OffsetDateTime, OffsetDateTime),
}

#[async_trait]
impl PageSource for RecentSearch<'_> {
    type Item = AuthoredTweet;

    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<AuthoredTweet>, SocialError> {
        self.api
            .search_recent(&self.query, MAX_RESULTS, Some(self.window), cursor)
            .await
    }
}

pub async fn collect_twitter(
    api: &TwitterApi,
    cfg: &TwitterConfig,
    ctx: &RunContext,
    now: OffsetDateTime,
) -> Result<Vec<TweetRecord>, CollectError> {
    let Some(window) = recent_window(&ctx.window, now) else {
        tracing::warn!(
            target: "twitter",
            start = %ctx.window.start,
            end = %ctx.window.end,
            "twitter.window.unreachable"
        );
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for keyword in cfg.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
        let remaining = cfg.max_total_tweets.saturating_sub(records.len());
        if remaining == 0 {
            tracing::info!(target: "twitter", cap = cfg.max_total_tweets, "twitter.total_cap_reached");
            break;
        }
        let source = RecentSearch {
            api,
            query: build_query(keyword, cfg.language.as_deref()),
            window,
        };
        let stream = Paginator::new(source, ctx.rate.clone())
            .limits(PageLimits::items(cfg.tweets_per_keyword))
            .window(Some(ctx.window))
            .label(keyword)
            .into_stream();
        let batch = collect_retained(stream, Some(remaining), |item: AuthoredTweet| {
            Some(tweet_record(&item, keyword))
        })
        .await?;
        tracing::info!(target: "twitter", keyword, tweets = batch.len(), "twitter.keyword.done");
        records.extend(batch);
    }
    Ok(ctx.dedupe(records))
}

pub async fn run_twitter(cfg: &TwitterConfig, ctx: &RunContext) -> Result<PlatformRun, CollectError> {
    let token = resolved_secret(&cfg.bearer_token).ok_or_else(|| {
        SocialError::missing_credential(Platform::Twitter, "twitter.bearer_token (TWITTER_BEARER_TOKEN)")
    })?;
    let api = TwitterApi::new(ctx.http_client(&cfg.base_url, None)?, token)?;
    let records = collect_twitter(&api, cfg, ctx, OffsetDateTime::now_utc()).await?;

    let files = ctx.write_output(&ctx.stem(Platform::Twitter), &records)?;
    Ok(PlatformRun::ok(Platform::Twitter, records.len(), files))
}
