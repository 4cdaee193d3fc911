//! Command-line argument dispatch.
//!
//! Turns validated CLI matches into an [`Action`] carrying everything the
//! server needs to start.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{self, auth, vault, ARG_DSN, ARG_FRONTEND_ORIGIN, ARG_PORT, ARG_SKIP_SEED};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    commands::validate(matches).map_err(|e| anyhow::anyhow!(e))?;

    let auth_opts = auth::Options::parse(matches)?;
    let vault_opts = vault::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        token_secret: auth_opts.token_secret,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        frontend_origin: matches
            .get_one::<String>(ARG_FRONTEND_ORIGIN)
            .filter(|origin| !origin.is_empty())
            .cloned(),
        seed_sample_events: !matches.get_flag(ARG_SKIP_SEED),
        vault: vault_opts,
    }))
}
