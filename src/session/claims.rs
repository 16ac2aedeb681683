//! Claims carried by the session-initiation token and the session context
//! derived from them. The context decides where account operations are rooted
//! (application or organization), which single-use token a verification page
//! consumes, and whether multi-factor authentication is required.

use crate::browser::{CookieExpiry, CookieStore, ORGANIZATION_NAME_KEY_COOKIE};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Decoded payload of the session-initiation token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Application resource URL; the root of every derived URL.
    #[serde(rename = "appHref")]
    pub app_href: String,
    /// Single-use token handed over directly by the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_token: Option<String>,
    /// Organization name key selected for this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onk: Option<String>,
    /// When truthy, account operations are rooted at `ash` instead of `appHref`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asnk: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_mfa: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Value>,
    /// Every other claim (`iss`, `sub`, `exp`, `state`, ...), untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("appHref has no API version segment: {0}")]
    MissingApiVersion(String),
}

/// Routing and flow facts derived once from the claims.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    /// Scheme, host and path prefix in front of the API version, with a trailing slash.
    pub base_url: String,
    /// API version segment, e.g. `v1`.
    pub api_version: String,
    pub app_href: String,
    pub application_id: String,
    /// Root for account, login and password reset operations.
    pub parent_resource_url: String,
    pub single_use_token: Option<String>,
    /// `require_mfa` claim as issued; `false` when absent.
    pub mfa_required: Value,
    pub organization_name_key: Option<String>,
}

impl SessionContext {
    /// Derives the session context and caches the organization name key.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::MissingApiVersion`] when `appHref` has no
    /// `/v<digit>/` segment; such claims decode but cannot be routed.
    pub fn resolve(claims: &Claims, cookies: &dyn CookieStore) -> Result<Self, ClaimsError> {
        let (base_url, api_version) = split_base_url(&claims.app_href)?;
        let application_id = application_id(&claims.app_href).to_string();

        let parent_resource_url = match (&claims.asnk, &claims.ash) {
            (Some(asnk), Some(ash)) if is_truthy(asnk) => ash.clone(),
            _ => claims.app_href.clone(),
        };

        let single_use_token = claims.sp_token.clone().or_else(|| {
            claims
                .scope
                .as_ref()
                .and_then(|scope| find_password_reset_token(scope, &application_id))
        });

        if let Some(onk) = &claims.onk {
            debug!("caching organization name key");
            cookies.set(ORGANIZATION_NAME_KEY_COOKIE, onk, CookieExpiry::Persistent);
        }

        Ok(Self {
            base_url,
            api_version,
            app_href: claims.app_href.clone(),
            application_id,
            parent_resource_url,
            single_use_token,
            mfa_required: claims.require_mfa.clone().unwrap_or(Value::Bool(false)),
            organization_name_key: claims.onk.clone(),
        })
    }

    /// Whether the issuer asked for a second factor.
    #[must_use]
    pub fn requires_mfa(&self) -> bool {
        is_truthy(&self.mfa_required)
    }

    /// `<base_url><api_version>/<path>`, for resources outside the parent resource.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// `<parent_resource_url>/<path>`.
    #[must_use]
    pub fn parent_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.parent_resource_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Scheme, host and path prefix up to the first `/v<digits>/` segment.
static BASE_URL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*://[^/]+/(?:[^/]+/)*?)(v\d+)/").ok()
});

fn split_base_url(app_href: &str) -> Result<(String, String), ClaimsError> {
    let captures = BASE_URL_PATTERN
        .as_ref()
        .and_then(|pattern| pattern.captures(app_href))
        .ok_or_else(|| ClaimsError::MissingApiVersion(app_href.to_string()))?;

    Ok((captures[1].to_string(), captures[2].to_string()))
}

fn application_id(app_href: &str) -> &str {
    app_href.rsplit('/').next().unwrap_or_default()
}

/// Finds the password reset slug an application scope carries.
///
/// `scope.application[application_id]` is expected to be a list of grants. The
/// first grant with a truthy `passwordResetToken` wins, and when that value is
/// an object its first key is the slug. Any other shape resolves to `None`.
/// When several grants carry a token, the later ones are ignored.
#[must_use]
pub fn find_password_reset_token(scope: &Value, application_id: &str) -> Option<String> {
    let grants = scope
        .get("application")?
        .get(application_id)?
        .as_array()?;

    let token = grants
        .iter()
        .filter_map(|grant| grant.get("passwordResetToken"))
        .find(|value| is_truthy(value))?;

    token.as_object()?.keys().next().cloned()
}

/// JavaScript-style truthiness, matching how the issuer treats claim flags.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
