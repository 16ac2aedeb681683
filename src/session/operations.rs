//! Operations available once the handshake succeeded. Each one checks its
//! arguments before anything is sent and hands back the pending request, so a
//! caller sees shape errors immediately and API errors when awaiting.

use super::{
    claims::SessionContext,
    error::{ArgumentError, RequestError},
    executor::{ApiRequest, RequestExecutor},
};
use crate::browser::{cached_organization_name_key, CookieExpiry, CookieStore, SESSION_COOKIE};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use std::{future::Future, sync::Arc};
use tracing::debug;

/// Account store a login attempt is directed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountStore {
    Href(String),
    NameKey(String),
}

impl AccountStore {
    fn to_json(&self) -> Value {
        match self {
            Self::Href(href) => json!({ "href": href }),
            Self::NameKey(name_key) => json!({ "nameKey": name_key }),
        }
    }
}

/// Credentials for [`IdSite::login`]. Either `provider_data` (social login) or
/// `login` plus `password`.
#[derive(Clone, Debug, Default)]
pub struct LoginRequest {
    pub login: Option<String>,
    pub password: Option<SecretString>,
    pub provider_data: Option<Value>,
    pub account_store: Option<AccountStore>,
}

impl LoginRequest {
    #[must_use]
    pub fn basic(login: impl Into<String>, password: SecretString) -> Self {
        Self {
            login: Some(login.into()),
            password: Some(password),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn provider(provider_data: Value) -> Self {
        Self {
            provider_data: Some(provider_data),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_account_store(mut self, account_store: AccountStore) -> Self {
        self.account_store = Some(account_store);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoginOptions {
    /// Sent as the `redirect` query parameter when set.
    pub redirect: Option<bool>,
}

/// Argument of [`IdSite::send_password_reset_email`].
#[derive(Clone, Debug, PartialEq)]
pub enum PasswordResetRequest {
    /// Plain email address, sent as `{"email": ...}`.
    Email(String),
    /// Full request body, e.g. `{"email": ..., "accountStore": {...}}`.
    Options(Value),
}

/// A ready ID-site session.
pub struct IdSite {
    context: SessionContext,
    executor: RequestExecutor,
    cookies: Arc<dyn CookieStore>,
    id_site_model: Value,
    custom_data: Value,
}

impl std::fmt::Debug for IdSite {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("IdSite")
            .field("context", &self.context)
            .field("id_site_model", &self.id_site_model)
            .field("custom_data", &self.custom_data)
            .finish_non_exhaustive()
    }
}

impl IdSite {
    pub(crate) fn new(
        context: SessionContext,
        executor: RequestExecutor,
        cookies: Arc<dyn CookieStore>,
        id_site_model: Value,
        custom_data: Value,
    ) -> Self {
        Self {
            context,
            executor,
            cookies,
            id_site_model,
            custom_data,
        }
    }

    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Site configuration returned by the handshake (`null` when absent).
    #[must_use]
    pub const fn id_site_model(&self) -> &Value {
        &self.id_site_model
    }

    #[must_use]
    pub const fn custom_data(&self) -> &Value {
        &self.custom_data
    }

    /// Current bearer credential.
    #[must_use]
    pub fn credential(&self) -> SecretString {
        self.executor.credential()
    }

    #[must_use]
    pub fn requires_mfa(&self) -> bool {
        self.context.requires_mfa()
    }

    /// Organization name key of this session, else the one cached by an
    /// earlier session.
    #[must_use]
    pub fn organization_name_key(&self) -> Option<String> {
        self.context
            .organization_name_key
            .clone()
            .or_else(|| cached_organization_name_key(self.cookies.as_ref()))
    }

    /// Logs in with a password or with social provider data.
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] when neither `login` nor `provider_data`
    /// is given, when `login` has no password, or when `provider_data` is not
    /// an object.
    pub fn login(
        &self,
        request: &LoginRequest,
        options: Option<&LoginOptions>,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        let (path, mut body) = if let Some(provider_data) = &request.provider_data {
            if !provider_data.is_object() {
                return Err(ArgumentError::NotAnObject("providerData"));
            }
            let mut body = Map::new();
            body.insert("providerData".to_string(), provider_data.clone());
            ("accounts", body)
        } else if let Some(login) = request.login.as_deref().filter(|login| !login.is_empty()) {
            let password = request
                .password
                .as_ref()
                .map(|password| password.expose_secret())
                .filter(|password| !password.is_empty())
                .ok_or(ArgumentError::MissingPassword)?;
            let value = Base64::encode_string(format!("{login}:{password}").as_bytes());
            let mut body = Map::new();
            body.insert("type".to_string(), json!("basic"));
            body.insert("value".to_string(), json!(value));
            ("loginAttempts", body)
        } else {
            return Err(ArgumentError::MissingLoginOrProviderData);
        };

        if let Some(account_store) = &request.account_store {
            body.insert("accountStore".to_string(), account_store.to_json());
        }

        let mut url = self.context.parent_url(path);
        if let Some(redirect) = options.and_then(|options| options.redirect) {
            url = format!("{url}?redirect={redirect}");
        }

        debug!(path, "login");
        Ok(self
            .executor
            .execute(ApiRequest::post(url, Some(Value::Object(body)))))
    }

    /// Creates an account under the parent resource.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::NotAnObject`] when `account` is not an object.
    pub fn register(
        &self,
        account: &Value,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        if !account.is_object() {
            return Err(ArgumentError::NotAnObject("account"));
        }
        Ok(self.executor.execute(ApiRequest::post(
            self.context.parent_url("accounts"),
            Some(account.clone()),
        )))
    }

    /// Consumes the email verification token carried by the session.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::MissingSingleUseToken`] when the claims held none.
    pub fn verify_email_token(
        &self,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        let token = self.single_use_token()?;
        Ok(self.executor.execute(ApiRequest::post(
            self.context
                .api_url(&format!("accounts/emailVerificationTokens/{token}")),
            None,
        )))
    }

    /// Looks up the password reset token carried by the session. The current
    /// credential is written to the session cookie whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::MissingSingleUseToken`] when the claims held none.
    pub fn verify_password_reset_token(
        &self,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        let token = self.single_use_token()?;
        let request = ApiRequest::get(
            self.context
                .parent_url(&format!("passwordResetTokens/{token}")),
        );
        Ok(async move {
            let result = self.executor.execute(request).await;
            self.persist_credential();
            result
        })
    }

    /// Sets a new password through a verified password reset token resource.
    /// Password policy violations come back as [`RequestError::Api`].
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] when the token resource has no `href` or
    /// the password is empty.
    pub fn set_account_password(
        &self,
        token_resource: &Value,
        password: &str,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        let href = href(token_resource, "password reset token")?;
        if password.is_empty() {
            return Err(ArgumentError::MissingPassword);
        }
        Ok(self.executor.execute(ApiRequest::post(
            href,
            Some(json!({ "password": password })),
        )))
    }

    /// Asks the API to email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] for an empty email or a non-object body.
    pub fn send_password_reset_email(
        &self,
        request: PasswordResetRequest,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        let body = match request {
            PasswordResetRequest::Email(email) if email.is_empty() => {
                return Err(ArgumentError::MissingEmail);
            }
            PasswordResetRequest::Email(email) => json!({ "email": email }),
            PasswordResetRequest::Options(options) if options.is_object() => options,
            PasswordResetRequest::Options(_) => {
                return Err(ArgumentError::NotAnObject("password reset options"));
            }
        };
        Ok(self.executor.execute(ApiRequest::post(
            self.context.parent_url("passwordResetTokens"),
            Some(body),
        )))
    }

    /// Lists the factors of `account`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::MissingHref`] when `account` has no `href`.
    pub fn get_factors(
        &self,
        account: &Value,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        let href = href(account, "account")?;
        Ok(self
            .executor
            .execute(ApiRequest::get(format!("{href}/factors"))))
    }

    /// # Errors
    ///
    /// Returns an [`ArgumentError`] when `account` has no `href` or `data` is
    /// not an object.
    pub fn create_factor(
        &self,
        account: &Value,
        data: &Value,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        let href = href(account, "account")?;
        if !data.is_object() {
            return Err(ArgumentError::NotAnObject("factor"));
        }
        Ok(self.executor.execute(ApiRequest::post(
            format!("{href}/factors"),
            Some(data.clone()),
        )))
    }

    /// Starts a challenge on `factor`, through its challenges collection when
    /// the factor links one.
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] when the factor has no usable `href` or
    /// `data` is not an object.
    pub fn create_challenge(
        &self,
        factor: &Value,
        data: Option<&Value>,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        let url = match factor
            .get("challenges")
            .and_then(|challenges| challenges.get("href"))
            .and_then(Value::as_str)
            .filter(|href| !href.is_empty())
        {
            Some(href) => href.to_string(),
            None => format!("{}/challenges", href(factor, "factor")?),
        };
        if data.is_some_and(|data| !data.is_object()) {
            return Err(ArgumentError::NotAnObject("challenge"));
        }
        Ok(self
            .executor
            .execute(ApiRequest::post(url, data.cloned())))
    }

    /// Answers a challenge, e.g. with `{"code": "123456"}`.
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] when `challenge` has no `href` or `data`
    /// is not an object.
    pub fn update_challenge(
        &self,
        challenge: &Value,
        data: &Value,
    ) -> Result<impl Future<Output = Result<Value, RequestError>> + '_, ArgumentError> {
        let href = href(challenge, "challenge")?;
        if !data.is_object() {
            return Err(ArgumentError::NotAnObject("challenge"));
        }
        Ok(self
            .executor
            .execute(ApiRequest::post(href, Some(data.clone()))))
    }

    fn single_use_token(&self) -> Result<&str, ArgumentError> {
        self.context
            .single_use_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(ArgumentError::MissingSingleUseToken)
    }

    fn persist_credential(&self) {
        if self.executor.has_credential() {
            self.cookies.set(
                SESSION_COOKIE,
                self.executor.credential().expose_secret(),
                CookieExpiry::Session,
            );
        }
    }
}

fn href<'a>(resource: &'a Value, name: &'static str) -> Result<&'a str, ArgumentError> {
    if !resource.is_object() {
        return Err(ArgumentError::NotAnObject(name));
    }
    resource
        .get("href")
        .and_then(Value::as_str)
        .filter(|href| !href.is_empty())
        .map(|href| href.trim_end_matches('/'))
        .ok_or(ArgumentError::MissingHref(name))
}
