//! Minimal HTTP client with safe logging, optional retries, and flexible auth.
//!
//! - Request options: headers, `Auth`, query params, timeout, retries
//! - Redacts sensitive query params and never logs secret values
//! - Retries are off by default; when enabled, 429/5xx are retried with
//!   exponential backoff and `Retry-After` support
//! - Optional *raw* request/response logging via `HARVEST_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), harvest_http::HttpError> {
//! let client = harvest_http::HttpClient::new("https://www.reddit.com")?;
//! let got: serde_json::Value = client
//!     .get_json("r/worldnews/new.json", harvest_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: `Auth::Bearer` values are sanitized before use, and logs only
//! ever include the auth kind (bearer/header/query/none), not the secret.
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), retries, final errors, the
//! pagination cursor found in the body, and (optionally) raw request/response
//! lines (target `http.raw`) when `HARVEST_HTTP_RAW=1`.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

pub use reqwest::StatusCode;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "HARVEST_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

pub const DEFAULT_USER_AGENT: &str = concat!("harvest/", env!("CARGO_PKG_VERSION"));

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(url: &Url, headers: Option<&HeaderMap>) -> String {
    let mut parts = vec!["curl".to_string()];
    for (name, val) in headers.into_iter().flatten() {
        let mut v = val.to_str().unwrap_or("").to_string();
        if name.as_str().eq_ignore_ascii_case("authorization") {
            v = "Bearer <redacted>".into();
        }
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }
    let mut shown = url.clone();
    let redacted: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    if !redacted.is_empty() {
        shown.query_pairs_mut().clear().extend_pairs(redacted);
    }
    parts.push(format!("'{}'", shown.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") || key.eq_ignore_ascii_case("set-cookie") {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        /// Machine readable reason when the API provides one
        /// (e.g. Google's `quotaExceeded`).
        reason: Option<String>,
        request_id: String,
    },
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            HttpError::Api { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use harvest_http::Auth;
/// use std::borrow::Cow;
///
/// let youtube = Auth::Query { name: "key", value: Cow::Borrowed("secret") };
/// match youtube {
///     Auth::Query { name, .. } => assert_eq!(name, "key"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Custom header
    Header {
        name: HeaderName,
        value: HeaderValue,
    },
    /// Auth via query param (YouTube: `key`)
    Query {
        name: &'a str,
        value: Cow<'a, str>,
    },
    None,
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use harvest_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     query: Some(vec![("limit", Cow::Borrowed("100"))]),
///     auth: Some(Auth::None),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.retries.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>, // e.g. [("q", "term".into())]
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    user_agent: String,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL. A trailing `/` is added to
    /// the base path so relative joins keep every segment.
    ///
    /// ```no_run
    /// use harvest_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://www.googleapis.com/youtube/v3")?;
    /// assert_eq!(client.base().as_str(), "https://www.googleapis.com/youtube/v3/");
    /// assert_eq!(client.default_timeout, Duration::from_secs(30));
    /// assert_eq!(client.max_retries, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let mut base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_timeout: Duration::from_secs(30),
            max_retries: 0,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Allow `n` retries of 429/5xx/network failures (default: none).
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// Reddit rejects generic agents, so every platform client sets its own.
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// GET `path` (relative to the base) and decode the JSON body.
    ///
    /// Network failures, 429 and 5xx are retried up to the configured budget;
    /// every other status is returned as [`HttpError::Api`] right away.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;
        let prepared = Prepared::new(&opts)?;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        let mut attempt = 0usize;
        loop {
            let req_id = format!("r{:06}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed));
            tracing::debug!(
                req_id = %req_id,
                attempt = attempt + 1,
                max_retries,
                host_path = %format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                query = ?prepared.redacted_query(),
                timeout_ms = timeout.as_millis() as u64,
                auth_kind = prepared.auth_kind,
                "http.request.start"
            );

            let outcome = self.send_once(&url, &opts, &prepared, timeout, &req_id).await;
            let (retry_after, failure) = match outcome {
                Ok(Reply { status, body, .. }) if status.is_success() => {
                    return decode(&body, &req_id);
                }
                Ok(Reply { status, headers, body }) => {
                    let ErrorDetail { message, reason } = extract_error_detail(&body);
                    let request_id = request_id_of(&headers).to_string();
                    let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if !retryable || attempt >= max_retries {
                        tracing::warn!(
                            req_id = %req_id,
                            %status,
                            message = %message,
                            reason = ?reason,
                            x_request_id = %request_id,
                            body_snippet = %snip_body(&body),
                            "http.error"
                        );
                        return Err(HttpError::Api {
                            status,
                            message,
                            reason,
                            request_id,
                        });
                    }
                    let floor = (status == StatusCode::TOO_MANY_REQUESTS).then_some(Duration::from_millis(1100));
                    let wait = retry_after_delay_secs(&headers).map(Duration::from_secs);
                    (wait.or(floor), format!("{status}: {message}"))
                }
                Err(message) => {
                    if attempt >= max_retries {
                        tracing::warn!(req_id = %req_id, attempt, max_retries, message = %message, "http.network_error");
                        return Err(HttpError::Network(message));
                    }
                    (None, message)
                }
            };

            attempt += 1;
            let exp = backoff(attempt);
            let delay = match retry_after {
                Some(d) if d > exp => d,
                _ => exp,
            };
            tracing::warn!(
                req_id = %req_id,
                attempt,
                max_retries,
                backoff_ms = delay.as_millis() as u64,
                message = %failure,
                "http.retrying"
            );
            sleep(delay).await;
        }
    }

    /// One round trip. `Err` carries a transport failure message.
    async fn send_once(
        &self,
        url: &Url,
        opts: &RequestOpts<'_>,
        prepared: &Prepared<'_>,
        timeout: Duration,
        req_id: &str,
    ) -> Result<Reply, String> {
        let mut rb = self
            .inner
            .get(url.clone())
            .timeout(timeout)
            .header(USER_AGENT, self.user_agent.as_str());
        if !prepared.query.is_empty() {
            let pairs: Vec<(&str, &str)> = prepared.query.iter().map(|(k, v)| (*k, v.as_ref())).collect();
            rb = rb.query(&pairs);
        }
        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }
        if let Some(tok) = &prepared.bearer {
            rb = rb.bearer_auth(tok);
        }
        if let Some(Auth::Header { name, value }) = &opts.auth {
            rb = rb.header(name, value);
        }

        let request = rb.build().map_err(|e| e.to_string())?;
        if raw_enabled() {
            let curl = make_curl(request.url(), opts.headers.as_ref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = std::time::Instant::now();
        let resp = self.inner.execute(request).await.map_err(|e| e.to_string())?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(|e| e.to_string())?.to_vec();
        let duration_ms = t0.elapsed().as_millis() as u64;

        // Reddit: x-ratelimit-*, Twitter: x-rate-limit-*
        let header_str = |a: &str, b: &str| {
            headers
                .get(a)
                .or_else(|| headers.get(b))
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        tracing::debug!(
            req_id = %req_id,
            %status,
            duration_ms,
            body_len = body.len(),
            x_request_id = %request_id_of(&headers),
            rate_limit.remaining = ?header_str("x-ratelimit-remaining", "x-rate-limit-remaining"),
            rate_limit.reset = ?header_str("x-ratelimit-reset", "x-rate-limit-reset"),
            "http.response.headers"
        );
        if raw_enabled() {
            let truncated = body.len() > RAW_MAX_BODY;
            let text = String::from_utf8_lossy(&body[..body.len().min(RAW_MAX_BODY)]);
            tracing::info!(
                target: "http.raw",
                %req_id,
                status = %status,
                duration_ms,
                headers = ?redact_headers(&headers),
                body = %text,
                truncated
            );
        }
        tracing::trace!(req_id = %req_id, body_snippet = %snip_body(&body), "http.response.body_snippet");

        Ok(Reply { status, headers, body })
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// Auth and query resolved once per call, so every retry sends the same request.
struct Prepared<'a> {
    query: Vec<(&'a str, Cow<'a, str>)>,
    bearer: Option<String>,
    auth_kind: &'static str,
}

impl<'a> Prepared<'a> {
    fn new(opts: &RequestOpts<'a>) -> Result<Self, HttpError> {
        let mut query = opts.query.clone().unwrap_or_default();
        let mut bearer = None;
        let auth_kind = match &opts.auth {
            Some(Auth::Bearer(tok)) => {
                bearer = Some(sanitize_api_key(tok)?);
                "bearer"
            }
            Some(Auth::Query { name, value }) => {
                query.push((*name, value.clone()));
                "query"
            }
            Some(Auth::Header { .. }) => "header",
            Some(Auth::None) | None => "none",
        };
        Ok(Self {
            query,
            bearer,
            auth_kind,
        })
    }

    fn redacted_query(&self) -> Vec<(&str, &str)> {
        self.query
            .iter()
            .map(|(k, v)| (*k, if is_secret_param(k) { "<redacted>" } else { v.as_ref() }))
            .collect()
    }
}

fn decode<T: DeserializeOwned>(body: &[u8], req_id: &str) -> Result<T, HttpError> {
    log_cursor(body, req_id);
    serde_json::from_slice::<T>(body).map_err(|e| {
        let snippet = snip_body(body);
        tracing::warn!(
            req_id = %req_id,
            serde_line = %e.line(),
            serde_col = %e.column(),
            serde_err = %e,
            body_snippet = %snippet,
            "http.response.decode_error"
        );
        HttpError::Decode(e.to_string(), snippet)
    })
}

/// Logs the page cursor at debug level. The body is only parsed a second
/// time when that level is on; returns the logged cursor.
fn log_cursor(body: &[u8], req_id: &str) -> Option<String> {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return None;
    }
    let val = serde_json::from_slice::<serde_json::Value>(body).ok()?;
    let cursor = page_cursor(&val).map(|c| c.to_string());
    tracing::debug!(req_id = %req_id, cursor = ?cursor, "http.response.cursor");
    cursor
}

fn request_id_of(headers: &HeaderMap) -> &str {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

// ==============================
// Helpers
// ==============================

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(10) as u32;
    Duration::from_millis(200u64.saturating_mul(1u64 << shift))
}

/// Pagination cursor of the known response shapes, for logging only.
fn page_cursor(val: &serde_json::Value) -> Option<&serde_json::Value> {
    val.get("nextPageToken")
        .or_else(|| val.get("meta").and_then(|m| m.get("next_token")))
        .or_else(|| val.get("data").and_then(|d| d.get("after")))
}

#[derive(Debug, PartialEq, Eq)]
struct ErrorDetail {
    message: String,
    reason: Option<String>,
}

fn extract_error_detail(body: &[u8]) -> ErrorDetail {
    // Google style: {"error":{"code":403,"message":"...","errors":[{"reason":"quotaExceeded"}]}}
    #[derive(Deserialize)]
    struct GoogleEnv {
        error: GoogleDetail,
    }
    #[derive(Deserialize)]
    struct GoogleDetail {
        message: String,
        #[serde(default)]
        errors: Vec<GoogleReason>,
    }
    #[derive(Deserialize)]
    struct GoogleReason {
        #[serde(default)]
        reason: Option<String>,
    }

    // Twitter: {"errors":[{"message":"...", "detail":"...", "title":"..."}]}
    #[derive(Deserialize)]
    struct TwErrors {
        errors: Vec<TwErr>,
    }
    #[derive(Deserialize)]
    struct TwErr {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        title: String,
    }

    // Reddit / generic: {"message":"Forbidden","error":403,"reason":"private"}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        reason: Option<String>,
    }

    if let Ok(env) = serde_json::from_slice::<GoogleEnv>(body) {
        let reason = env.error.errors.into_iter().find_map(|e| e.reason);
        return ErrorDetail {
            message: env.error.message,
            reason,
        };
    }
    if let Ok(tw) = serde_json::from_slice::<TwErrors>(body) {
        if let Some(first) = tw.errors.into_iter().next() {
            let message = [first.message, first.detail, first.title]
                .into_iter()
                .find(|s| !s.is_empty());
            if let Some(message) = message {
                return ErrorDetail {
                    message,
                    reason: None,
                };
            }
        }
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        let message = if !m.message.is_empty() {
            Some(m.message)
        } else if !m.detail.is_empty() {
            Some(m.detail)
        } else {
            None
        };
        if let Some(message) = message {
            return ErrorDetail {
                message,
                reason: m.reason,
            };
        }
    }
    ErrorDetail {
        message: snip_body(body),
        reason: None,
    }
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        let mut cut = 500;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    // Trim outer spaces/quotes, then drop any embedded whitespace.
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn cursor_is_parsed_only_when_debug_is_enabled() {
        let body = br#"{"items":[],"nextPageToken":"CAoQAA"}"#;
        let quiet = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(quiet, || {
            assert_eq!(log_cursor(body, "r1"), None);
        });

        let verbose = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(verbose, || {
            assert_eq!(log_cursor(body, "r1").as_deref(), Some("\"CAoQAA\""));
        });
    }

    #[test]
    fn google_errors_surface_reason() {
        let body = br#"{"error":{"code":403,"message":"quota gone","errors":[{"reason":"quotaExceeded","domain":"youtube.quota"}]}}"#;
        let detail = extract_error_detail(body);
        assert_eq!(detail.message, "quota gone");
        assert_eq!(detail.reason.as_deref(), Some("quotaExceeded"));
    }

    #[test]
    fn reddit_errors_ignore_numeric_error_field() {
        let body = br#"{"message": "Forbidden", "error": 403, "reason": "private"}"#;
        let detail = extract_error_detail(body);
        assert_eq!(detail.message, "Forbidden");
        assert_eq!(detail.reason.as_deref(), Some("private"));
    }

    #[test]
    fn twitter_errors_fall_back_to_detail() {
        let body = br#"{"errors":[{"detail":"Too Many Requests"}]}"#;
        assert_eq!(extract_error_detail(body).message, "Too Many Requests");
    }

    #[test]
    fn unparseable_body_is_snipped() {
        let body = "x".repeat(600);
        let detail = extract_error_detail(body.as_bytes());
        assert_eq!(detail.message.len(), 503);
        assert!(detail.reason.is_none());
    }

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_api_key("  \"ab c\n\" ").unwrap(), "abc");
        assert!(sanitize_api_key("   ").is_err());
        assert!(sanitize_api_key("tøken").is_err());
    }

    #[test]
    fn curl_redacts_secret_query_params() {
        let url = Url::parse("https://example.com/search?q=gaza&key=SECRET").unwrap();
        let curl = make_curl(&url, None);
        assert!(curl.contains("q=gaza"));
        assert!(!curl.contains("SECRET"));
    }

    #[test]
    fn base_gets_trailing_slash() {
        let client = HttpClient::new("https://www.googleapis.com/youtube/v3").unwrap();
        assert_eq!(
            client.base().join("search").unwrap().as_str(),
            "https://www.googleapis.com/youtube/v3/search"
        );
    }

    #[tokio::test]
    async fn get_json_sends_query_auth_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/search"))
            .and(query_param("q", "gaza"))
            .and(query_param("key", "k-123"))
            .and(header("user-agent", "harvest-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&format!("{}/v3", server.uri()))
            .unwrap()
            .with_user_agent("harvest-test");
        let got: serde_json::Value = client
            .get_json(
                "search",
                RequestOpts {
                    query: Some(vec![("q", "gaza".into())]),
                    auth: Some(Auth::Query {
                        name: "key",
                        value: "k-123".into(),
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(got["ok"], true);
    }

    #[tokio::test]
    async fn non_success_is_not_retried_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let err = client
            .get_json::<serde_json::Value>("anything", RequestOpts::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn server_errors_retry_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap().with_retries(1);
        let err = client
            .get_json::<serde_json::Value>("anything", RequestOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Api { .. }));
    }
}
