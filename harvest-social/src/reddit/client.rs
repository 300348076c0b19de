use crate::reddit::extract::flatten_comments;
use crate::reddit::types::{Comment, Listing, Post};
use crate::{Page, SocialError};
use harvest_common::Platform;
use harvest_http::{HttpClient, HttpError, RequestOpts, StatusCode};
use std::borrow::Cow;

/// Reddit caps listing pages at 100 items.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug)]
pub struct RedditApi {
    http: HttpClient,
}

impl RedditApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Newest posts of one subreddit (`/r/{sub}/new.json`).
    pub async fn new_posts(
        &self,
        subreddit: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<Page<Post>, SocialError> {
        let path = format!("r/{}/new.json", subreddit);
        let mut params = page_params(after, limit);
        params.push(("raw_json", "1".into()));
        self.listing_page(&path, params, subreddit).await
    }

    /// Reddit's own search restricted to one subreddit, newest first.
    pub async fn search_posts(
        &self,
        subreddit: &str,
        query: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<Page<Post>, SocialError> {
        let path = format!("r/{}/search.json", subreddit);
        let mut params = page_params(after, limit);
        params.push(("q", query.to_string().into()));
        params.push(("restrict_sr", "1".into()));
        params.push(("sort", "new".into()));
        params.push(("raw_json", "1".into()));
        self.listing_page(&path, params, subreddit).await
    }

    /// Comment tree of one post, flattened depth-first and cut at `limit`.
    pub async fn post_comments(&self, post_id: &str, limit: usize) -> Result<Vec<Comment>, SocialError> {
        let path = format!("comments/{}.json", post_id);
        let params: Vec<(&str, Cow<'_, str>)> = vec![
            ("limit", limit.to_string().into()),
            ("raw_json", "1".into()),
        ];
        let (_post, comments): (Listing<serde_json::Value>, Listing<serde_json::Value>) = self
            .http
            .get_json(
                &path,
                RequestOpts {
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| map_err(e, post_id))?;

        let mut out = Vec::new();
        flatten_comments(comments, &mut out);
        out.truncate(limit);
        tracing::debug!(target: "reddit", post_id, count = out.len(), "reddit.comments");
        Ok(out)
    }

    async fn listing_page(
        &self,
        path: &str,
        params: Vec<(&str, Cow<'_, str>)>,
        subreddit: &str,
    ) -> Result<Page<Post>, SocialError> {
        let listing: Listing<Post> = self
            .http
            .get_json(
                path,
                RequestOpts {
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| map_err(e, subreddit))?;

        let next = listing.data.after.filter(|a| !a.is_empty());
        let items: Vec<Post> = listing
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == "t3")
            .map(|thing| thing.data)
            .collect();

        tracing::debug!(
            target: "reddit",
            subreddit,
            items = items.len(),
            next = ?next,
            "reddit.page"
        );
        Ok(Page { items, next })
    }
}

fn page_params(after: Option<&str>, limit: u32) -> Vec<(&'static str, Cow<'static, str>)> {
    let mut params: Vec<(&str, Cow<'_, str>)> =
        vec![("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string().into())];
    if let Some(after) = after {
        params.push(("after", after.to_string().into()));
    }
    params
}

fn map_err(err: HttpError, what: &str) -> SocialError {
    match err.status() {
        Some(StatusCode::FORBIDDEN) => SocialError::Auth {
            platform: Platform::Reddit,
            message: format!("access to {what} was refused (private, quarantined or blocked user agent)"),
        },
        Some(StatusCode::NOT_FOUND) => SocialError::NotFound {
            platform: Platform::Reddit,
            what: what.to_string(),
        },
        _ => SocialError::from_http(Platform::Reddit, err),
    }
}
