//! Thin wrapper around `/2/tweets/search/recent`.
//!
//! Handles bearer auth, request parameter shaping and the seven day window
//! before delegating to the shared HTTP client.
use crate::twitter::extract::{AuthoredTweet, authored_tweets};
use crate::twitter::types::SearchResponse;
use crate::{Page, SocialError};
use harvest_common::{DateWindow, Platform};
use harvest_http::{Auth, HttpClient, RequestOpts};
use std::borrow::Cow;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

const TWITTER_BASE: &str = "https://api.twitter.com";

const TWEET_FIELDS: &str = "created_at,lang,entities,public_metrics,author_id";

#[derive(Clone, Debug)]
pub struct TwitterApi {
    http: HttpClient,
    bearer: String,
}

impl TwitterApi {
    pub fn new(http: HttpClient, bearer_token: impl Into<String>) -> Result<Self, SocialError> {
        let bearer = bearer_token.into();
        if bearer.trim().is_empty() {
            return Err(SocialError::missing_credential(
                Platform::Twitter,
                "TWITTER_BEARER_TOKEN",
            ));
        }
        Ok(Self { http, bearer })
    }

    pub fn with_token(bearer_token: impl Into<String>) -> Result<Self, SocialError> {
        let http = HttpClient::new(TWITTER_BASE)
            .map_err(|e| SocialError::from_http(Platform::Twitter, e))?;
        Self::new(http, bearer_token)
    }

    /// One page of recent search results. `window` must already lie inside
    /// the last seven days, see [`recent_window`].
    pub async fn search_recent(
        &self,
        query: &str,
        max_results: u32,
        window: Option<(OffsetDateTime, OffsetDateTime)>,
        next_token: Option<&str>,
    ) -> Result<Page<AuthoredTweet>, SocialError> {
        let max_results = max_results.clamp(10, 100);

        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("query", query.into()),
            ("max_results", max_results.to_string().into()),
            ("tweet.fields", TWEET_FIELDS.into()),
            ("expansions", "author_id".into()),
            ("user.fields", "username".into()),
        ];
        if let Some((start, end)) = window {
            params.push(("start_time", rfc3339(start).into()));
            params.push(("end_time", rfc3339(end).into()));
        }
        if let Some(token) = next_token {
            params.push(("next_token", token.into()));
        }

        let resp: SearchResponse = self
            .http
            .get_json(
                "2/tweets/search/recent",
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.bearer)),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| SocialError::from_http(Platform::Twitter, e))?;

        let next = resp.meta.next_token.clone();
        let items = authored_tweets(resp);
        tracing::debug!(target: "twitter", query, items = items.len(), next = ?next, "twitter.page");
        Ok(Page { items, next })
    }
}

/// Intersect `window` with what recent search accepts at `now`: no earlier
/// than seven days back and no later than ten seconds ago. A minute of
/// slack on the start and twenty seconds on the end keep the request valid
/// by the time it arrives. `None` when nothing of the window is reachable.
pub fn recent_window(
    window: &DateWindow,
    now: OffsetDateTime,
) -> Option<(OffsetDateTime, OffsetDateTime)> {
    let earliest = now - Duration::days(7) + Duration::minutes(1);
    let latest = now - Duration::seconds(20);

    let start = to_offset(window.start)?.max(earliest);
    let end = to_offset(window.end)?.min(latest);
    (start < end).then_some((start, end))
}

/// Keyword plus optional `lang:` operator.
pub fn build_query(keyword: &str, language: Option<&str>) -> String {
    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(lang) => format!("{keyword} lang:{lang}"),
        None => keyword.to_string(),
    }
}

fn to_offset(ts: chrono::DateTime<chrono::Utc>) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(ts.timestamp()).ok()
}

fn rfc3339(ts: OffsetDateTime) -> String {
    ts.replace_nanosecond(0)
        .unwrap_or(ts)
        .format(&Rfc3339)
        .unwrap_or_default()
}
