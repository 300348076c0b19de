//! Subreddit collection: newest-first listings (or per-keyword search),
//! keyword filtering and optional comment trees.
use crate::context::RunContext;
use crate::error::CollectError;
use crate::filter::{ItemFilter, KeywordFilter, Verdict};
use crate::pagination::{PageLimits, PageSource, Paginator, collect_retained};
use crate::summary::PlatformRun;
use async_trait::async_trait;
use harvest_common::{Platform, RedditComment, RedditPost};
use harvest_config::{RedditConfig, RedditMode};
use harvest_social::reddit::RedditApi;
use harvest_social::reddit::client::MAX_PAGE_SIZE;
use harvest_social::reddit::extract::{comment_record, post_record, search_text};
use harvest_social::reddit::types::Post;
use harvest_social::{Page, SocialError};

/// One subreddit's `new` listing, or its search results for `query`.
struct ListingSource<'a> {
    api: &'a RedditApi,
    subreddit: &'a str,
    query: Option<&'a str>,
}

#[async_trait]
impl PageSource for ListingSource<'_> {
    type Item = Post;

    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<Post>, SocialError> {
        match self.query {
            Some(q) => {
                self.api
                    .search_posts(self.subreddit, q, cursor, MAX_PAGE_SIZE)
                    .await
            }
            None => self.api.new_posts(self.subreddit, cursor, MAX_PAGE_SIZE).await,
        }
    }
}

#[derive(Debug, Default)]
pub struct RedditOutput {
    pub posts: Vec<RedditPost>,
    pub comments: Vec<RedditComment>,
}

pub async fn collect_reddit(
    api: &RedditApi,
    cfg: &RedditConfig,
    ctx: &RunContext,
) -> Result<RedditOutput, CollectError> {
    let keywords = KeywordFilter::new(&cfg.keywords)?;
    let mut out = RedditOutput::default();

    tracing::info!(
        target: "reddit",
        subreddits = cfg.subreddits.len(),
        keywords = keywords.keywords().len(),
        mode = ?cfg.mode,
        "reddit.start"
    );

    'subs: for subreddit in &cfg.subreddits {
        match cfg.mode {
            RedditMode::Listing => {
                let remaining = cfg.max_total_posts.saturating_sub(out.posts.len());
                if remaining == 0 {
                    break 'subs;
                }
                let source = ListingSource {
                    api,
                    subreddit,
                    query: None,
                };
                let batch = walk(source, cfg, ctx, remaining, &keywords, subreddit).await?;
                tracing::info!(target: "reddit", subreddit = %subreddit, posts = batch.len(), "reddit.subreddit.done");
                out.posts.extend(batch);
            }
            RedditMode::Search => {
                for keyword in keywords.keywords() {
                    let remaining = cfg.max_total_posts.saturating_sub(out.posts.len());
                    if remaining == 0 {
                        break 'subs;
                    }
                    // Reddit search is fuzzy; keep only posts that contain the query text.
                    let single = KeywordFilter::new([keyword])?;
                    let source = ListingSource {
                        api,
                        subreddit,
                        query: Some(keyword),
                    };
                    let label = format!("{subreddit}?q={keyword}");
                    let batch = walk(source, cfg, ctx, remaining, &single, &label).await?;
                    tracing::info!(
                        target: "reddit",
                        subreddit = %subreddit,
                        keyword = %keyword,
                        posts = batch.len(),
                        "reddit.search.done"
                    );
                    out.posts.extend(batch);
                }
            }
        }
    }
    if out.posts.len() >= cfg.max_total_posts {
        tracing::info!(target: "reddit", cap = cfg.max_total_posts, "reddit.total_cap_reached");
    }
    out.posts = ctx.dedupe(std::mem::take(&mut out.posts));

    if cfg.comments_per_post > 0 {
        for post in &out.posts {
            ctx.rate.acquire().await;
            let comments = api.post_comments(&post.post_id, cfg.comments_per_post).await?;
            out.comments
                .extend(comments.iter().map(|c| comment_record(c, &post.post_id)));
        }
        tracing::info!(target: "reddit", comments = out.comments.len(), "reddit.comments.done");
    }
    Ok(out)
}

/// Walk one listing and keep posts that carry a keyword. With no keywords
/// configured every post in the window is kept.
async fn walk(
    source: ListingSource<'_>,
    cfg: &RedditConfig,
    ctx: &RunContext,
    remaining: usize,
    keywords: &KeywordFilter,
    label: &str,
) -> Result<Vec<RedditPost>, CollectError> {
    let filter = ItemFilter::keywords_only(keywords.clone());
    let keep_all = keywords.is_empty();
    let stream = Paginator::new(source, ctx.rate.clone())
        .limits(PageLimits::walked(cfg.posts_per_subreddit))
        .window(Some(ctx.window))
        .label(format!("r/{label}"))
        .into_stream();

    let posts = collect_retained(stream, Some(remaining), |post: Post| {
        if keep_all {
            return Some(post_record(&post, ""));
        }
        match filter.check(&post.subreddit, &search_text(&post))? {
            Verdict::Keyword(k) => Some(post_record(&post, k)),
            Verdict::Allowed => Some(post_record(&post, "")),
        }
    })
    .await?;
    Ok(posts)
}

/// Collect, then write `reddit_<dataset>.*` and, when comments were
/// requested, `reddit_<dataset>_comments.*`.
pub async fn run_reddit(cfg: &RedditConfig, ctx: &RunContext) -> Result<PlatformRun, CollectError> {
    let http = ctx.http_client(&cfg.base_url, Some(&cfg.user_agent))?;
    let api = RedditApi::new(http);
    let output = collect_reddit(&api, cfg, ctx).await?;

    let stem = ctx.stem(Platform::Reddit);
    let mut files = ctx.write_output(&stem, &output.posts)?;
    if cfg.comments_per_post > 0 {
        files.extend(ctx.write_output(&format!("{stem}_comments"), &output.comments)?);
    }
    Ok(PlatformRun::ok(Platform::Reddit, output.posts.len(), files))
}
