//! Session bootstrap: token lookup, claims decoding and the handshake that
//! exchanges the session-initiation token for a bearer credential.
//!
//! Flow Overview: `Bootstrap::new` resolves and decodes the token and derives
//! the session context without touching the network. `Bootstrap::finish` sends
//! the handshake (`GET <parent resource>?expand=idSiteModel,customData`), checks
//! that the response issued a credential, persists it to the session cookie and
//! returns a ready [`IdSite`]. Failures found by `new` are held back and
//! reported by `finish`, so every outcome is delivered once, from the same
//! place.

use super::{
    claims::SessionContext,
    error::SessionError,
    executor::{ApiRequest, RequestExecutor},
    jwt,
    operations::IdSite,
    token_source::TokenSource,
};
use crate::browser::{CookieExpiry, CookieStore, LocationAccessor, SESSION_COOKIE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const HANDSHAKE_EXPAND: &str = "expand=idSiteModel,customData";

/// Construction inputs for a session bootstrap.
pub struct IdSiteOptions {
    pub location: Arc<dyn LocationAccessor>,
    pub cookies: Arc<dyn CookieStore>,
    /// Session-initiation token supplied directly; skips the token source.
    pub jwt: Option<String>,
    /// Pre-issued bearer credential. Skips the token source and the session
    /// cookie write; when no `jwt` is given the claims are read from it. Seeds
    /// the executor, including an injected one.
    pub auth_token: Option<SecretString>,
    /// Executor to use instead of a fresh one. One that already holds a
    /// credential is treated like `auth_token`: the handshake presents that
    /// credential and nothing is persisted.
    pub executor: Option<RequestExecutor>,
}

impl IdSiteOptions {
    #[must_use]
    pub fn new(location: Arc<dyn LocationAccessor>, cookies: Arc<dyn CookieStore>) -> Self {
        Self {
            location,
            cookies,
            jwt: None,
            auth_token: None,
            executor: None,
        }
    }

    #[must_use]
    pub fn with_jwt(mut self, jwt: impl Into<String>) -> Self {
        self.jwt = Some(jwt.into());
        self
    }

    #[must_use]
    pub fn with_auth_token(mut self, auth_token: SecretString) -> Self {
        self.auth_token = Some(auth_token);
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: RequestExecutor) -> Self {
        self.executor = Some(executor);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapState {
    Initializing,
    AwaitingHandshake,
    Ready,
    Failed,
}

struct Handshake {
    context: SessionContext,
    executor: RequestExecutor,
    cookies: Arc<dyn CookieStore>,
    /// Initiation token presented on the handshake. `None` when the executor
    /// already held a credential.
    initiation_token: Option<SecretString>,
}

/// A session bootstrap in progress. Consumed by [`Bootstrap::finish`].
pub struct Bootstrap {
    state: BootstrapState,
    outcome: Result<Handshake, SessionError>,
}

impl Bootstrap {
    /// Resolves and decodes the session-initiation token and derives the
    /// session context. Never fails directly; see [`Bootstrap::finish`].
    #[must_use]
    pub fn new(options: IdSiteOptions) -> Self {
        debug!(state = ?BootstrapState::Initializing, "bootstrapping session");
        let outcome = prepare(options);
        let state = match &outcome {
            Ok(_) => BootstrapState::AwaitingHandshake,
            Err(err) => {
                warn!(state = ?BootstrapState::Failed, "session bootstrap failed: {err}");
                BootstrapState::Failed
            }
        };
        Self { state, outcome }
    }

    #[must_use]
    pub const fn state(&self) -> BootstrapState {
        self.state
    }

    /// Session context derived from the claims, once decoding succeeded.
    #[must_use]
    pub fn context(&self) -> Option<&SessionContext> {
        self.outcome.as_ref().ok().map(|handshake| &handshake.context)
    }

    /// Performs the handshake and returns the ready session.
    ///
    /// # Errors
    ///
    /// Returns the named [`SessionError`] conditions (`JWT_NOT_FOUND`,
    /// `NOT_A_JWT`, `MALFORMED_JWT_CLAIMS`, `SESSION_EXPIRED`,
    /// `NO_AUTH_TOKEN_HEADER`), claims misconfiguration, or the request error
    /// of the handshake as-is.
    #[instrument(skip(self))]
    pub async fn finish(self) -> Result<IdSite, SessionError> {
        let handshake = self.outcome?;
        let result = handshake.run().await;
        match &result {
            Ok(_) => info!(state = ?BootstrapState::Ready, "session ready"),
            Err(err) => warn!(state = ?BootstrapState::Failed, "session handshake failed: {err}"),
        }
        result
    }
}

fn prepare(options: IdSiteOptions) -> Result<Handshake, SessionError> {
    let IdSiteOptions {
        location,
        cookies,
        jwt,
        auth_token,
        executor,
    } = options;

    let token = match (&jwt, &auth_token) {
        (Some(jwt), _) => Some(jwt.clone()),
        (None, Some(auth_token)) => Some(auth_token.expose_secret().to_string()),
        (None, None) => TokenSource::new(location, cookies.clone()).resolve(),
    }
    .filter(|token| !token.is_empty())
    .ok_or(SessionError::JwtNotFound)?;

    let claims = jwt::decode(&token)?;
    let context = SessionContext::resolve(&claims, cookies.as_ref())?;
    debug!(
        parent_resource_url = %context.parent_resource_url,
        single_use_token = context.single_use_token.is_some(),
        "session context resolved"
    );

    let executor = match executor {
        Some(executor) => executor,
        None => RequestExecutor::new(None)?,
    };
    if let Some(auth_token) = auth_token {
        executor.seed_credential(auth_token);
    }

    let supplied = executor.has_credential();
    let initiation_token = (!supplied).then(|| SecretString::from(token));

    Ok(Handshake {
        context,
        executor,
        cookies,
        initiation_token,
    })
}

impl Handshake {
    async fn run(self) -> Result<IdSite, SessionError> {
        let mut request = ApiRequest::get(with_query(
            &self.context.parent_resource_url,
            HANDSHAKE_EXPAND,
        ));
        if let Some(initiation_token) = &self.initiation_token {
            request = request.with_bearer(initiation_token.clone());
        }

        let body = self.executor.execute(request).await?;

        if !self.executor.has_credential() {
            return Err(SessionError::NoAuthTokenHeader);
        }

        // A supplied credential belongs to the caller; only issued ones are persisted.
        if self.initiation_token.is_some() {
            self.cookies.set(
                SESSION_COOKIE,
                self.executor.credential().expose_secret(),
                CookieExpiry::Session,
            );
        }

        let id_site_model = body.get("idSiteModel").cloned().unwrap_or(Value::Null);
        let custom_data = body.get("customData").cloned().unwrap_or(Value::Null);

        Ok(IdSite::new(
            self.context,
            self.executor,
            self.cookies,
            id_site_model,
            custom_data,
        ))
    }
}

fn with_query(url: &str, query: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}
