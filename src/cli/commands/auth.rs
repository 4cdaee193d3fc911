use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::auth::{DEFAULT_TOKEN_TTL_SECONDS, MAX_TOKEN_TTL_SECONDS};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub token_secret: Option<SecretString>,
    pub token_ttl_seconds: i64,
}

impl Options {
    /// # Errors
    /// Returns an error if the TTL is outside `1..=MAX_TOKEN_TTL_SECONDS`.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let token_ttl_seconds = matches
            .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);
        if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&token_ttl_seconds) {
            anyhow::bail!(
                "--{ARG_TOKEN_TTL_SECONDS} must be between 1 and {MAX_TOKEN_TTL_SECONDS}"
            );
        }

        Ok(Self {
            token_secret: matches
                .get_one::<String>(ARG_TOKEN_SECRET)
                .filter(|secret| !secret.is_empty())
                .map(|secret| SecretString::from(secret.clone())),
            token_ttl_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret used to sign session tokens")
                .long_help(
                    "Secret used to sign session tokens. Required unless --vault-url is set, in which case it is read from the Vault KV secret when not given here.",
                )
                .env("MEETMATCH_TOKEN_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Session token lifetime in seconds")
                .env("MEETMATCH_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TOKEN_TTL_SECONDS)),
        )
}
