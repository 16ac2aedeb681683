use crate::cli::{
    actions::{bootstrap::Args, Action},
    commands::{ARG_AUTH_TOKEN, ARG_COOKIE_JAR, ARG_LOCATION},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let location = matches
        .get_one::<String>(ARG_LOCATION)
        .cloned()
        .context("missing required argument: --location")?;

    let cookie_jar = matches.get_one::<PathBuf>(ARG_COOKIE_JAR).cloned();

    let auth_token = matches
        .get_one::<String>(ARG_AUTH_TOKEN)
        .filter(|token| !token.is_empty())
        .map(|token| SecretString::from(token.clone()));

    Ok(Action::Bootstrap(Args {
        location,
        cookie_jar,
        auth_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler_bootstrap_args() -> Result<()> {
        let matches = commands::new().try_get_matches_from(vec![
            "idsite",
            "--location",
            "https://id.example.com/?jwt=a.b.c",
            "--auth-token",
            "issued",
        ])?;

        let Action::Bootstrap(args) = handler(&matches)?;
        assert_eq!(args.location, "https://id.example.com/?jwt=a.b.c");
        assert_eq!(
            args.auth_token.as_ref().map(|token| token.expose_secret()),
            Some("issued")
        );
        Ok(())
    }
}
