use crate::error::api_message;
use crate::youtube::types::{CommentThread, CommentThreadListResponse, SearchListResponse, SearchResult};
use crate::{Page, SocialError};
use chrono::{DateTime, SecondsFormat, Utc};
use harvest_common::Platform;
use harvest_http::{Auth, HttpClient, HttpError, RequestOpts, StatusCode};
use std::borrow::Cow;

/// `search.list` and `commentThreads.list` both cap pages at these sizes.
pub const MAX_SEARCH_RESULTS: u32 = 50;
pub const MAX_COMMENT_RESULTS: u32 = 100;

#[derive(Clone, Debug)]
pub struct YoutubeApi {
    http: HttpClient,
    key: String,
}

/// Parameters of one channel-scoped video search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub channel_id: String,
    pub query: String,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub max_results: u32,
}

impl YoutubeApi {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Result<Self, SocialError> {
        let key = api_key.into();
        if key.trim().is_empty() {
            return Err(SocialError::missing_credential(Platform::Youtube, "YOUTUBE_API_KEY"));
        }
        Ok(Self { http, key })
    }

    /// Newest-first videos of one channel matching `query.query`.
    pub async fn search_videos(
        &self,
        query: &SearchQuery,
        page_token: Option<&str>,
    ) -> Result<Page<SearchResult>, SocialError> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("part", "snippet".into()),
            ("channelId", query.channel_id.as_str().into()),
            ("type", "video".into()),
            ("order", "date".into()),
            (
                "maxResults",
                query.max_results.clamp(1, MAX_SEARCH_RESULTS).to_string().into(),
            ),
        ];
        if !query.query.is_empty() {
            params.push(("q", query.query.as_str().into()));
        }
        if let Some(after) = query.published_after {
            params.push(("publishedAfter", rfc3339(after).into()));
        }
        if let Some(before) = query.published_before {
            params.push(("publishedBefore", rfc3339(before).into()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.into()));
        }

        let resp: SearchListResponse = self
            .http
            .get_json("search", self.opts(params))
            .await
            .map_err(|e| classify(e, None))?;

        let items: Vec<SearchResult> = resp
            .items
            .into_iter()
            .filter(|item| item.id.video_id.is_some())
            .collect();
        tracing::debug!(
            target: "youtube",
            channel_id = %query.channel_id,
            q = %query.query,
            items = items.len(),
            "youtube.search.page"
        );
        Ok(Page {
            items,
            next: resp.next_page_token,
        })
    }

    /// One page of top-level comment threads of a video.
    pub async fn comment_threads(
        &self,
        video_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<Page<CommentThread>, SocialError> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("part", "snippet".into()),
            ("videoId", video_id.into()),
            (
                "maxResults",
                max_results.clamp(1, MAX_COMMENT_RESULTS).to_string().into(),
            ),
            ("textFormat", "plainText".into()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.into()));
        }

        let resp: CommentThreadListResponse = self
            .http
            .get_json("commentThreads", self.opts(params))
            .await
            .map_err(|e| classify(e, Some(video_id)))?;

        tracing::debug!(target: "youtube", video_id, items = resp.items.len(), "youtube.comments.page");
        Ok(Page {
            items: resp.items,
            next: resp.next_page_token,
        })
    }

    fn opts<'a>(&'a self, query: Vec<(&'a str, Cow<'a, str>)>) -> RequestOpts<'a> {
        RequestOpts {
            auth: Some(Auth::Query {
                name: "key",
                value: Cow::Borrowed(self.key.as_str()),
            }),
            query: Some(query),
            ..Default::default()
        }
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Google reports the interesting part in `errors[].reason`, not the status.
fn classify(err: HttpError, video_id: Option<&str>) -> SocialError {
    match err.reason() {
        Some("quotaExceeded" | "dailyLimitExceeded") => SocialError::Quota {
            platform: Platform::Youtube,
            message: format!(
                "{} (daily quota of {} units is spent, retry tomorrow)",
                api_message(&err),
                super::DAILY_QUOTA
            ),
        },
        Some("rateLimitExceeded") => SocialError::Quota {
            platform: Platform::Youtube,
            message: format!(
                "{} (per-user request rate exceeded, raise collection.delay_ms and retry in a few minutes)",
                api_message(&err)
            ),
        },
        Some("keyInvalid" | "keyExpired" | "forbidden" | "accessNotConfigured") => SocialError::Auth {
            platform: Platform::Youtube,
            message: api_message(&err),
        },
        Some("commentsDisabled") => SocialError::CommentsDisabled {
            video_id: video_id.unwrap_or_default().to_string(),
        },
        Some("videoNotFound" | "channelNotFound") => SocialError::NotFound {
            platform: Platform::Youtube,
            what: video_id.map(str::to_string).unwrap_or_else(|| api_message(&err)),
        },
        _ if err.status() == Some(StatusCode::FORBIDDEN) => SocialError::Auth {
            platform: Platform::Youtube,
            message: api_message(&err),
        },
        _ => SocialError::from_http(Platform::Youtube, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn google_error(code: u16, reason: &str) -> ResponseTemplate {
        ResponseTemplate::new(code).set_body_json(json!({
            "error": {
                "code": code,
                "message": format!("The request failed: {reason}"),
                "errors": [{"reason": reason, "domain": "youtube.quota"}]
            }
        }))
    }

    fn api_for(server: &MockServer) -> YoutubeApi {
        YoutubeApi::new(HttpClient::new(&server.uri()).unwrap(), "test-key").unwrap()
    }

    fn query() -> SearchQuery {
        SearchQuery {
            channel_id: "UC16niRr50-MSBwiO3YDb3RA".into(),
            query: "Gaza".into(),
            published_after: Some(Utc.with_ymd_and_hms(2023, 10, 7, 0, 0, 0).unwrap()),
            published_before: None,
            max_results: 10,
        }
    }

    #[tokio::test]
    async fn search_sends_key_and_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("key", "test-key"))
            .and(query_param("q", "Gaza"))
            .and(query_param("publishedAfter", "2023-10-07T00:00:00Z"))
            .and(query_param("maxResults", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nextPageToken": "CAoQAA",
                "items": [
                    {"id": {"kind": "youtube#video", "videoId": "v1"},
                     "snippet": {"publishedAt": "2024-01-02T03:04:05Z", "channelId": "UC1", "title": "t", "description": "d", "channelTitle": "BBC News"}},
                    {"id": {"kind": "youtube#channel"},
                     "snippet": {"publishedAt": "2024-01-02T03:04:05Z"}}
                ]
            })))
            .mount(&server)
            .await;

        let page = api_for(&server).search_videos(&query(), None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id.video_id.as_deref(), Some("v1"));
        assert_eq!(page.next.as_deref(), Some("CAoQAA"));
    }

    #[tokio::test]
    async fn quota_exceeded_says_retry_tomorrow() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(google_error(403, "quotaExceeded"))
            .mount(&server)
            .await;

        let err = api_for(&server).search_videos(&query(), None).await.unwrap_err();
        assert!(matches!(err, SocialError::Quota { .. }), "{err:?}");
        assert!(err.to_string().contains("retry tomorrow"));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn short_term_rate_limit_is_not_reported_as_daily_quota() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(google_error(403, "rateLimitExceeded"))
            .mount(&server)
            .await;

        let err = api_for(&server).search_videos(&query(), None).await.unwrap_err();
        assert!(matches!(err, SocialError::Quota { .. }), "{err:?}");
        let msg = err.to_string();
        assert!(msg.contains("collection.delay_ms"), "{msg}");
        assert!(!msg.contains("retry tomorrow"), "{msg}");
    }

    #[tokio::test]
    async fn disabled_comments_are_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/commentThreads"))
            .respond_with(google_error(403, "commentsDisabled"))
            .mount(&server)
            .await;

        let err = api_for(&server).comment_threads("v9", None, 100).await.unwrap_err();
        match &err {
            SocialError::CommentsDisabled { video_id } => assert_eq!(video_id, "v9"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn invalid_key_is_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(google_error(400, "keyInvalid"))
            .mount(&server)
            .await;

        let err = api_for(&server).search_videos(&query(), None).await.unwrap_err();
        assert!(matches!(err, SocialError::Auth { platform: Platform::Youtube, .. }));
    }

    #[test]
    fn empty_key_is_rejected_up_front() {
        let http = HttpClient::new("http://localhost").unwrap();
        assert!(matches!(
            YoutubeApi::new(http, "  "),
            Err(SocialError::Auth { .. })
        ));
    }
}
