use harvest_common::Platform;
use harvest_http::{HttpError, StatusCode};

/// Failures a platform client can report.
///
/// `Auth` and `Quota` end a collection run; `CommentsDisabled` only skips the
/// affected video.
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("{platform}: authentication failed: {message}")]
    Auth {
        platform: Platform,
        message: String,
    },
    #[error("{platform}: quota or rate limit exceeded: {message}")]
    Quota {
        platform: Platform,
        message: String,
    },
    #[error("{platform}: not found: {what}")]
    NotFound { platform: Platform, what: String },
    #[error("youtube: comments are disabled for video {video_id}")]
    CommentsDisabled { video_id: String },
    #[error("{platform}: {source}")]
    Http {
        platform: Platform,
        #[source]
        source: HttpError,
    },
    #[error("telegram: {0}")]
    Telegram(String),
}

impl SocialError {
    pub fn missing_credential(platform: Platform, what: &str) -> Self {
        SocialError::Auth {
            platform,
            message: format!("{what} is not set (check .env / harvest.yaml)"),
        }
    }

    /// Errors that must stop the whole run rather than one request.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SocialError::CommentsDisabled { .. })
    }

    /// Classify an HTTP failure with the status codes every platform shares.
    pub(crate) fn from_http(platform: Platform, err: HttpError) -> Self {
        match err.status() {
            Some(StatusCode::UNAUTHORIZED) => SocialError::Auth {
                platform,
                message: api_message(&err),
            },
            Some(StatusCode::TOO_MANY_REQUESTS) => SocialError::Quota {
                platform,
                message: api_message(&err),
            },
            _ => SocialError::Http {
                platform,
                source: err,
            },
        }
    }
}

pub(crate) fn api_message(err: &HttpError) -> String {
    match err {
        HttpError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
