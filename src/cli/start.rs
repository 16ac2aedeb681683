use crate::cli::{
    actions::Action,
    commands::{self, logging},
    dispatch, telemetry,
};
use anyhow::Result;
use std::ffi::OsString;
use tracing::{debug, Level};

/// Parses the process arguments, installs logging and returns the bootstrap
/// action for the binary to run.
///
/// # Errors
///
/// Returns an error if telemetry cannot be installed or the arguments do not
/// describe an action.
pub fn start() -> Result<Action> {
    let (level, action) = parse(std::env::args_os())?;

    telemetry::init(level)?;
    debug!(%level, "logging initialized");

    Ok(action)
}

/// Exits the process on `--help`, `--version` or a usage error.
fn parse<I, T>(args: I) -> Result<(Level, Action)>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = commands::new().get_matches_from(args);
    let action = dispatch::handler(&matches)?;
    Ok((logging::level(&matches), action))
}
