//! Authenticated requests against the identity API. Every call carries the
//! current bearer credential and every response may rotate it; the rotation
//! happens in one response stage so call sites never deal with it. The
//! credential is never logged and never persisted here.

use super::error::{ApiError, RequestError};
use reqwest::{
    header::{HeaderMap, ACCEPT, AUTHORIZATION},
    Client, Method,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument};

const BEARER_SCHEME: &str = "bearer";

/// A request to the identity API.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    /// Bearer used for this call instead of the stored credential.
    pub bearer: Option<SecretString>,
}

impl ApiRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
            bearer: None,
        }
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body,
            bearer: None,
        }
    }

    #[must_use]
    pub fn with_bearer(mut self, bearer: SecretString) -> Self {
        self.bearer = Some(bearer);
        self
    }
}

/// Issues authenticated calls and keeps the rotating bearer credential.
#[derive(Clone, Debug)]
pub struct RequestExecutor {
    client: Client,
    credential: Arc<RwLock<SecretString>>,
}

impl RequestExecutor {
    /// Creates an executor with the default HTTP client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credential: Option<SecretString>) -> Result<Self, RequestError> {
        let client = Client::builder().user_agent(crate::APP_USER_AGENT).build()?;
        Ok(Self::with_client(client, credential))
    }

    #[must_use]
    pub fn with_client(client: Client, credential: Option<SecretString>) -> Self {
        Self {
            client,
            credential: Arc::new(RwLock::new(credential.unwrap_or_default())),
        }
    }

    /// Current bearer credential; empty until one is seeded or issued.
    #[must_use]
    pub fn credential(&self) -> SecretString {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        !self
            .credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .expose_secret()
            .is_empty()
    }

    /// Replaces the stored credential. Clones of this executor see the change.
    pub(crate) fn seed_credential(&self, credential: SecretString) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential;
    }

    /// Sends `request` and returns the decoded JSON body (`null` when empty).
    ///
    /// # Errors
    /// Returns [`RequestError::Transport`] when the API cannot be reached,
    /// [`RequestError::Api`] for non-success statuses and
    /// [`RequestError::Decode`] when a success body is not JSON.
    #[instrument(skip(self, request), fields(http.method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: ApiRequest) -> Result<Value, RequestError> {
        let bearer = request.bearer.unwrap_or_else(|| self.credential());

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .header(ACCEPT, "application/json");

        if !bearer.expose_secret().is_empty() {
            builder = builder.bearer_auth(bearer.expose_secret());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        // Rotation applies to every response, error statuses included.
        self.capture_credential(response.headers());

        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), "identity API responded");

        if !status.is_success() {
            return Err(RequestError::Api(ApiError::from_body(status.as_u16(), &body)));
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body).map_err(RequestError::Decode)
    }

    /// Stores a renewed credential from the response `Authorization` header.
    /// Returns whether the credential was replaced.
    fn capture_credential(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        else {
            return false;
        };

        let token = strip_bearer(value);
        if token.is_empty() {
            return false;
        }

        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = SecretString::from(token.to_string());
        debug!("bearer credential rotated");
        true
    }
}

fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(char::is_whitespace) {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => token.trim(),
        None if value.eq_ignore_ascii_case(BEARER_SCHEME) => "",
        _ => value,
    }
}
