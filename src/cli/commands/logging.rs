use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSE: &str = "verbose";
pub const ARG_LOG_LEVEL: &str = "log-level";

const LEVELS: [Level; 5] = [
    Level::ERROR,
    Level::WARN,
    Level::INFO,
    Level::DEBUG,
    Level::TRACE,
];

/// Accepts a level name (any case) or its index, `0` (error) to `4` (trace).
fn parse_level(value: &str) -> Result<Level, String> {
    let value = value.trim();
    if let Ok(index) = value.parse::<usize>() {
        return LEVELS
            .get(index)
            .copied()
            .ok_or_else(|| format!("log level index must be 0-{}", LEVELS.len() - 1));
    }

    LEVELS
        .iter()
        .copied()
        .find(|level| level.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("unknown log level: {value}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSE)
                .short('v')
                .long("verbose")
                .help("Raise log verbosity, repeat for more (-v warn, -vv info, -vvv debug, -vvvv trace)")
                .global(true)
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new(ARG_LOG_LEVEL)
                .long("log-level")
                .help("Log level: error, warn, info, debug, trace or 0-4 (default: error)")
                .env("IDSITE_LOG_LEVEL")
                .global(true)
                .value_parser(ValueParser::from(parse_level)),
        )
}

/// Level to log at. A `-v` count wins over `--log-level` and
/// `IDSITE_LOG_LEVEL`; with neither only errors are logged.
#[must_use]
pub fn level(matches: &ArgMatches) -> Level {
    match matches.get_count(ARG_VERBOSE) {
        0 => matches
            .get_one::<Level>(ARG_LOG_LEVEL)
            .copied()
            .unwrap_or(Level::ERROR),
        count => LEVELS[usize::from(count).min(LEVELS.len() - 1)],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> ArgMatches {
        with_args(Command::new("idsite"))
            .try_get_matches_from(args)
            .unwrap()
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Ok(Level::DEBUG));
        assert_eq!(parse_level("WARN"), Ok(Level::WARN));
        assert_eq!(parse_level(" Info "), Ok(Level::INFO));
        assert_eq!(parse_level("0"), Ok(Level::ERROR));
        assert_eq!(parse_level("4"), Ok(Level::TRACE));
        assert!(parse_level("5").is_err());
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn test_level_defaults_to_error() {
        temp_env::with_var("IDSITE_LOG_LEVEL", None::<&str>, || {
            assert_eq!(level(&matches(&["idsite"])), Level::ERROR);
        });
    }

    #[test]
    fn test_level_from_verbose_count() {
        temp_env::with_var("IDSITE_LOG_LEVEL", None::<&str>, || {
            assert_eq!(level(&matches(&["idsite", "-v"])), Level::WARN);
            assert_eq!(level(&matches(&["idsite", "-vvv"])), Level::DEBUG);
            assert_eq!(level(&matches(&["idsite", "-vvvvvvv"])), Level::TRACE);
        });
    }

    #[test]
    fn test_level_from_env() {
        temp_env::with_var("IDSITE_LOG_LEVEL", Some("info"), || {
            assert_eq!(level(&matches(&["idsite"])), Level::INFO);
            // An explicit -v count takes over.
            assert_eq!(level(&matches(&["idsite", "-v"])), Level::WARN);
        });
    }

    #[test]
    fn test_level_from_flag() {
        temp_env::with_var("IDSITE_LOG_LEVEL", Some("trace"), || {
            assert_eq!(
                level(&matches(&["idsite", "--log-level", "debug"])),
                Level::DEBUG
            );
        });
    }
}
