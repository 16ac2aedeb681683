use crate::{
    browser::{CookieJar, LocationAccessor, StaticLocation},
    session::{Bootstrap, IdSiteOptions},
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, instrument};

#[derive(Debug)]
pub struct Args {
    pub location: String,
    pub cookie_jar: Option<PathBuf>,
    pub auth_token: Option<SecretString>,
}

/// Bootstraps the session and prints the site model as JSON.
///
/// # Errors
/// Returns an error if the cookie jar cannot be read or written, or if the
/// bootstrap fails.
pub async fn execute(args: Args) -> Result<()> {
    let output = bootstrap(args).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[instrument(skip(args), fields(cookie_jar = ?args.cookie_jar))]
async fn bootstrap(args: Args) -> Result<Value> {
    let cookies = Arc::new(match &args.cookie_jar {
        Some(path) => CookieJar::load(path)
            .with_context(|| format!("failed to load cookie jar {}", path.display()))?,
        None => CookieJar::new(),
    });
    let location = Arc::new(StaticLocation::new(args.location));

    let mut options = IdSiteOptions::new(location.clone(), cookies.clone());
    if let Some(auth_token) = args.auth_token {
        options = options.with_auth_token(auth_token);
    }

    let result = Bootstrap::new(options).finish().await;

    info!(location = %location.href(), "location after token lookup");

    // The token was consumed even when the handshake failed.
    if let Some(path) = &args.cookie_jar {
        cookies
            .save(path)
            .with_context(|| format!("failed to save cookie jar {}", path.display()))?;
    }

    let site = result.map_err(|err| match err.code() {
        Some(code) => anyhow!("{code}: {err}"),
        None => anyhow!(err),
    })?;

    Ok(json!({
        "idSiteModel": site.id_site_model(),
        "customData": site.custom_data(),
    }))
}
