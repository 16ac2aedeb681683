use super::{claims::ClaimsError, jwt};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Maximum number of error body characters kept when the API returns non-JSON.
const MAX_ERROR_CHARS: usize = 200;

/// Error resource returned by the identity API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub code: Option<u64>,
    pub message: String,
    pub developer_message: Option<String>,
    pub more_info: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    code: Option<u64>,
    message: Option<String>,
    developer_message: Option<String>,
    more_info: Option<String>,
}

impl ApiError {
    /// Builds an error from a response body, falling back to the raw text when
    /// the body is not an error resource.
    #[must_use]
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        if let Ok(parsed) = serde_json::from_slice::<ApiErrorBody>(body) {
            return Self {
                status,
                code: parsed.code,
                message: parsed
                    .message
                    .unwrap_or_else(|| "Request failed.".to_string()),
                developer_message: parsed.developer_message,
                more_info: parsed.more_info,
            };
        }

        Self {
            status,
            code: None,
            message: sanitize_body(&String::from_utf8_lossy(body)),
            developer_message: None,
            more_info: None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(
                formatter,
                "Request failed ({}, code {code}): {}",
                self.status, self.message
            ),
            None => write!(formatter, "Request failed ({}): {}", self.status, self.message),
        }
    }
}

/// Trims and truncates error bodies so they stay presentable.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

/// Outcome of a single call through the request executor.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("unable to reach the identity API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Api(ApiError),
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl RequestError {
    /// HTTP status of an API error response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Terminal outcome of a session bootstrap.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session-initiation token in the location or cookies")]
    JwtNotFound,
    #[error("session-initiation token is not a JWT")]
    NotAJwt,
    #[error("session-initiation token claims are malformed")]
    MalformedJwtClaims(#[source] jwt::Error),
    #[error("session expired")]
    SessionExpired(#[source] RequestError),
    #[error("handshake response carried no bearer credential; the Authorization header may have been stripped by a proxy")]
    NoAuthTokenHeader,
    #[error(transparent)]
    Claims(#[from] ClaimsError),
    #[error(transparent)]
    Request(RequestError),
}

impl SessionError {
    /// Named condition code; `None` for errors passed through as-is.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::JwtNotFound => Some("JWT_NOT_FOUND"),
            Self::NotAJwt => Some("NOT_A_JWT"),
            Self::MalformedJwtClaims(_) => Some("MALFORMED_JWT_CLAIMS"),
            Self::SessionExpired(_) => Some("SESSION_EXPIRED"),
            Self::NoAuthTokenHeader => Some("NO_AUTH_TOKEN_HEADER"),
            Self::Claims(_) | Self::Request(_) => None,
        }
    }
}

impl From<jwt::Error> for SessionError {
    fn from(err: jwt::Error) -> Self {
        match err {
            jwt::Error::NotAJwt => Self::NotAJwt,
            err => Self::MalformedJwtClaims(err),
        }
    }
}

impl From<RequestError> for SessionError {
    fn from(err: RequestError) -> Self {
        if err.status() == Some(401) {
            Self::SessionExpired(err)
        } else {
            Self::Request(err)
        }
    }
}

/// Argument rejected before any request is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("login requires either `login` or `providerData`")]
    MissingLoginOrProviderData,
    #[error("login requires a password")]
    MissingPassword,
    #[error("{0} must be a JSON object")]
    NotAnObject(&'static str),
    #[error("{0} must carry an href")]
    MissingHref(&'static str),
    #[error("the session carries no single-use token")]
    MissingSingleUseToken,
    #[error("email must not be empty")]
    MissingEmail,
}
