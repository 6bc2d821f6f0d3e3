use crate::cache::MAX_TTL;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_CACHE: &str = "cache";
pub const ARG_CACHE_TTL: &str = "cache-ttl";
pub const ARG_CACHE_KEY_PREFIX: &str = "cache-key-prefix";

#[derive(Debug, Clone)]
pub struct Options {
    pub target: Option<String>,
    pub ttl: Duration,
    pub key_prefix: String,
}

impl Options {
    /// Parse cache arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the TTL is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let ttl = matches
            .get_one::<u64>(ARG_CACHE_TTL)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_CACHE_TTL}"))?;

        Ok(Self {
            target: matches
                .get_one::<String>(ARG_CACHE)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
            ttl: Duration::from_secs(ttl),
            key_prefix: matches
                .get_one::<String>(ARG_CACHE_KEY_PREFIX)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CACHE)
                .long(ARG_CACHE)
                .help("Cache backend: `memory`, a redis:// URL or a Redis unix socket path (disabled when unset)")
                .env("MFA_STATUS_CACHE"),
        )
        .arg(
            Arg::new(ARG_CACHE_TTL)
                .long(ARG_CACHE_TTL)
                .help("Seconds a cached status stays valid (at most one week)")
                .env("MFA_STATUS_CACHE_TTL")
                .default_value("300")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TTL.as_secs())),
        )
        .arg(
            Arg::new(ARG_CACHE_KEY_PREFIX)
                .long(ARG_CACHE_KEY_PREFIX)
                .help("Prefix for cache keys, joined with ':' (bare username when empty)")
                .env("MFA_STATUS_CACHE_KEY_PREFIX"),
        )
}
