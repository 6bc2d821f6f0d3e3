use crate::{
    api::{self, AppState},
    cache::Cache,
    cli::commands::{cache, duo, ldap},
    directory::{DirectoryConfig, LdapDirectory},
    duo::{DuoClient, DuoConfig},
    status::{Aggregator, StatusService},
};
use anyhow::{Context, Result};
use axum::http::HeaderName;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub remote_user_header: HeaderName,
    pub upstream_timeout: Duration,
    pub duo: duo::Options,
    pub ldap: ldap::Options,
    pub cache: cache::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a client cannot be built, the cache is unreachable, or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let duo = DuoClient::new(DuoConfig {
        ikey: args.duo.ikey,
        skey: args.duo.skey,
        host: args.duo.host,
        timeout: args.upstream_timeout,
    })
    .context("Failed to build Duo client")?;

    let directory = LdapDirectory::new(DirectoryConfig {
        uri: args.ldap.uri,
        bind_dn: args.ldap.bind_dn,
        bind_password: args.ldap.password,
        base_dn: args.ldap.base_dn,
        filter: args.ldap.filter,
        timeout: args.upstream_timeout,
    });

    let cache = Cache::connect(args.cache.target.as_deref())
        .await
        .context("Failed to connect to cache")?;

    let service = StatusService::new(
        Aggregator::new(duo, directory, args.ldap.locked_group),
        cache.clone(),
    )
    .with_ttl(args.cache.ttl)
    .with_key_prefix(args.cache.key_prefix);

    let app = api::router(AppState::new(Arc::new(service), args.remote_user_header));

    let result = api::serve(args.port, app).await;

    cache.quit().await;

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("remote_user_header", args.remote_user_header.to_string()),
        (
            "upstream_timeout",
            format!("{}s", args.upstream_timeout.as_secs()),
        ),
        ("duo_host", args.duo.host.clone()),
        ("duo_ikey", args.duo.ikey.clone()),
        ("ldap_uri", args.ldap.uri.clone()),
        (
            "ldap_bind_dn",
            args.ldap
                .bind_dn
                .clone()
                .unwrap_or_else(|| "anonymous".to_string()),
        ),
        ("ldap_base_dn", args.ldap.base_dn.clone()),
        ("ldap_filter", args.ldap.filter.clone()),
        (
            "locked_group",
            args.ldap
                .locked_group
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        ),
        (
            "cache",
            args.cache
                .target
                .as_deref()
                .map_or_else(|| "disabled".to_string(), redact_cache_target),
        ),
        ("cache_ttl", format!("{}s", args.cache.ttl.as_secs())),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_cache_target(target: &str) -> String {
    if target == "memory" || target.starts_with('/') {
        return target.to_string();
    }

    match Url::parse(target) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-url".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
