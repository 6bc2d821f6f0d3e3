//! Map validated CLI arguments to the action the binary runs.

use crate::cli::{
    actions::{Action, server::Args},
    commands::{ARG_PORT, ARG_REMOTE_USER_HEADER, ARG_UPSTREAM_TIMEOUT, cache, duo, ldap},
};
use anyhow::{Context, Result};
use axum::http::HeaderName;
use std::time::Duration;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let remote_user_header = matches
        .get_one::<String>(ARG_REMOTE_USER_HEADER)
        .context("missing required argument: --remote-user-header")?;
    let remote_user_header = HeaderName::try_from(remote_user_header.trim())
        .with_context(|| format!("invalid header name: {remote_user_header}"))?;

    let upstream_timeout = matches
        .get_one::<u64>(ARG_UPSTREAM_TIMEOUT)
        .copied()
        .map(Duration::from_secs)
        .context("missing required argument: --upstream-timeout")?;

    Ok(Action::Server(Args {
        port,
        remote_user_header,
        upstream_timeout,
        duo: duo::Options::parse(matches)?,
        ldap: ldap::Options::parse(matches)?,
        cache: cache::Options::parse(matches)?,
    }))
}
