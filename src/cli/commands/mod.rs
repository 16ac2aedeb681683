pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};
use std::path::PathBuf;

pub const ARG_LOCATION: &str = "location";
pub const ARG_COOKIE_JAR: &str = "cookie-jar";
pub const ARG_AUTH_TOKEN: &str = "auth-token";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("idsite")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_LOCATION)
                .short('l')
                .long("location")
                .help("ID site URL the browser was sent to, example: https://id.example.com/?jwt=<token>")
                .env("IDSITE_LOCATION")
                .required(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_JAR)
                .short('c')
                .long("cookie-jar")
                .help("JSON cookie jar to read the token from and store the session in")
                .env("IDSITE_COOKIE_JAR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_AUTH_TOKEN)
                .long("auth-token")
                .help("Pre-issued bearer credential; skips the token lookup and the session cookie")
                .env("IDSITE_AUTH_TOKEN")
                .hide_env_values(true),
        );

    logging::with_args(command)
}
