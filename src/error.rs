use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between building a request and decoding
/// its response.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller input rejected before any network call was made.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Token signing failed.
    #[error("authentication error: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Api(ApiError),

    /// Non-2xx response whose body was not a JSON:API error document.
    #[error("API request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A polled resource settled in a terminal failure state.
    #[error("resource reached failure state {state}")]
    StateFailed { state: String },
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api().is_some_and(ApiError::is_not_found)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.api().is_some_and(ApiError::is_unauthorized)
    }

    pub fn is_forbidden(&self) -> bool {
        self.api().is_some_and(ApiError::is_forbidden)
    }

    /// True for both explicit cancellation and an elapsed deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }

    /// HTTP status of the failed response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(e) => Some(e.status),
            Error::Http { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// One entry of a JSON:API `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    NotFound,
    Unauthorized,
    Forbidden,
    Other,
}

/// A non-2xx response carrying at least one structured error entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    errors: Vec<ApiErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorDocument {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

impl ApiError {
    /// Returns `None` when `errors` is empty.
    pub fn new(status: u16, errors: Vec<ApiErrorEntry>) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }
        Some(Self { status, errors })
    }

    pub fn errors(&self) -> &[ApiErrorEntry] {
        &self.errors
    }

    pub fn first(&self) -> &ApiErrorEntry {
        &self.errors[0]
    }

    pub fn has_code(&self, token: &str) -> bool {
        self.errors.iter().any(|e| code_matches(&e.code, token))
    }

    pub fn is_not_found(&self) -> bool {
        self.has_code("NOT_FOUND")
    }

    // Apple sends NOT_AUTHORIZED on 401s.
    pub fn is_unauthorized(&self) -> bool {
        self.has_code("UNAUTHORIZED") || self.has_code("NOT_AUTHORIZED")
    }

    pub fn is_forbidden(&self) -> bool {
        self.has_code("FORBIDDEN") || self.has_code("FORBIDDEN_ERROR")
    }

    pub fn kind(&self) -> ApiErrorKind {
        if self.is_not_found() {
            ApiErrorKind::NotFound
        } else if self.is_unauthorized() {
            ApiErrorKind::Unauthorized
        } else if self.is_forbidden() {
            ApiErrorKind::Forbidden
        } else {
            ApiErrorKind::Other
        }
    }
}

fn code_matches(code: &str, token: &str) -> bool {
    code == token
        || code
            .strip_prefix(token)
            .is_some_and(|rest| rest.starts_with('.'))
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.first();
        write!(f, "API error ({}): {}", self.status, first.title)?;
        if !first.detail.is_empty() {
            write!(f, " - {}", first.detail)?;
        }
        if !first.code.is_empty() {
            write!(f, " [{}]", first.code)?;
        }
        if self.errors.len() > 1 {
            write!(f, " (and {} more)", self.errors.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Turns a non-2xx response into a typed error.
pub fn classify(status: StatusCode, body: &[u8]) -> Error {
    let parsed = serde_json::from_slice::<ErrorDocument>(body)
        .ok()
        .and_then(|doc| ApiError::new(status.as_u16(), doc.errors));
    match parsed {
        Some(api) => Error::Api(api),
        None => Error::Http {
            status: status.as_u16(),
            body: String::from_utf8_lossy(body).trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, title: &str, detail: &str) -> ApiErrorEntry {
        ApiErrorEntry {
            id: None,
            status: None,
            code: code.into(),
            title: title.into(),
            detail: detail.into(),
        }
    }

    #[test]
    fn forbidden_body_is_classified() {
        let body = br#"{"errors":[{"code":"FORBIDDEN","title":"Forbidden","detail":"not allowed"}]}"#;
        let err = classify(StatusCode::FORBIDDEN, body);
        let msg = err.to_string();
        assert!(msg.contains("Forbidden"), "{msg}");
        assert!(msg.contains("not allowed"));
        assert!(err.is_forbidden());
        assert!(!err.is_unauthorized());
        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn unauthorized_is_distinct_from_forbidden() {
        let body = br#"{"errors":[{"status":"401","code":"NOT_AUTHORIZED","title":"Authentication credentials are missing or invalid.","detail":"Provide a properly configured and signed bearer token"}]}"#;
        let err = classify(StatusCode::UNAUTHORIZED, body);
        assert!(err.is_unauthorized());
        assert!(!err.is_forbidden());
        assert_eq!(err.api().unwrap().kind(), ApiErrorKind::Unauthorized);
    }

    #[test]
    fn status_alone_does_not_classify() {
        // 404 status without a NOT_FOUND code is not a not-found error.
        let body = br#"{"errors":[{"code":"PARAMETER_ERROR.INVALID","title":"A parameter has an invalid value","detail":"x"}]}"#;
        let err = classify(StatusCode::NOT_FOUND, body);
        assert!(!err.is_not_found());
        assert_eq!(err.api().unwrap().kind(), ApiErrorKind::Other);
    }

    #[test]
    fn dotted_codes_match_prefix_token() {
        let api = ApiError::new(404, vec![entry("NOT_FOUND.APP", "Not found", "")]).unwrap();
        assert!(api.is_not_found());
        let api = ApiError::new(400, vec![entry("NOT_FOUNDATION", "x", "")]).unwrap();
        assert!(!api.is_not_found());
    }

    #[test]
    fn unparseable_body_falls_back_to_status() {
        let err = classify(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert!(matches!(err, Error::Http { status: 502, .. }));
        assert!(err.to_string().contains("502"));

        let err = classify(StatusCode::INTERNAL_SERVER_ERROR, br#"{"errors":[]}"#);
        assert!(matches!(err, Error::Http { status: 500, .. }));
    }

    #[test]
    fn display_mentions_extra_entries() {
        let api = ApiError::new(
            409,
            vec![
                entry("ENTITY_ERROR", "Conflict", "first"),
                entry("ENTITY_ERROR", "Conflict", "second"),
            ],
        )
        .unwrap();
        assert_eq!(
            api.to_string(),
            "API error (409): Conflict - first [ENTITY_ERROR] (and 1 more)"
        );
    }

    #[test]
    fn empty_entries_are_rejected() {
        assert!(ApiError::new(400, Vec::new()).is_none());
    }
}
