//! # idsite (hosted identity site session client)
//!
//! `idsite` bootstraps an authenticated session for a hosted identity site. The
//! site is opened with a signed session-initiation token (a JWT) either in the
//! `jwt=` query parameter or in a cookie; the token is consumed, its claims are
//! decoded and turned into a [`session::SessionContext`], and a handshake call
//! against the remote identity API exchanges it for a bearer credential.
//!
//! ## Credential rotation
//!
//! Every response from the identity API may carry a renewed bearer credential in
//! its `Authorization` header. The [`session::RequestExecutor`] captures it on
//! every call, so the next request always carries the latest value. The
//! credential is persisted to the session cookie only by the bootstrapper and by
//! the password reset token verification flow.
//!
//! ## Trust model
//!
//! Tokens are decoded structurally; signatures are **not** verified here. Trust
//! is deferred to the remote API, which rejects forged or expired tokens during
//! the handshake (`SESSION_EXPIRED`).
//!
//! ## Browser state
//!
//! Location and cookies are reached through the [`browser::LocationAccessor`]
//! and [`browser::CookieStore`] traits, so the whole flow runs outside a browser
//! (the `idsite` binary uses a JSON cookie jar on disk).

pub mod browser;
pub mod cli;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
