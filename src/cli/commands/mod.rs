pub mod cache;
pub mod duo;
pub mod ldap;
pub mod logging;

use crate::api::DEFAULT_REMOTE_USER_HEADER;
use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_REMOTE_USER_HEADER: &str = "remote-user-header";
pub const ARG_UPSTREAM_TIMEOUT: &str = "upstream-timeout";

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

    let command = Command::new("mfa-status")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("MFA_STATUS_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_REMOTE_USER_HEADER)
                .long(ARG_REMOTE_USER_HEADER)
                .help("Request header carrying the authenticated username")
                .long_help(
                    "Request header carrying the authenticated username. It must be set by a trusted reverse proxy or auth layer; the service does not authenticate users itself.",
                )
                .default_value(DEFAULT_REMOTE_USER_HEADER)
                .env("MFA_STATUS_REMOTE_USER_HEADER"),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_TIMEOUT)
                .long(ARG_UPSTREAM_TIMEOUT)
                .help("Timeout in seconds for every single Duo or LDAP call")
                .default_value("10")
                .env("MFA_STATUS_UPSTREAM_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..)),
        );

    let command = duo::with_args(command);
    let command = ldap::with_args(command);
    let command = cache::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 7] = [
        "mfa-status",
        "--duo-ikey",
        "DIXXXXXXXXXXXXXXXXXX",
        "--duo-skey",
        "secret",
        "--duo-host",
        "api-xxxxxxxx.duosecurity.com",
    ];

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "mfa-status");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(
            [
                "MFA_STATUS_PORT",
                "MFA_STATUS_REMOTE_USER_HEADER",
                "MFA_STATUS_UPSTREAM_TIMEOUT",
                "MFA_STATUS_LDAP_URI",
                "MFA_STATUS_LDAP_BASE_DN",
                "MFA_STATUS_LDAP_FILTER",
                "MFA_STATUS_CACHE_TTL",
            ],
            || {
                let matches = new().get_matches_from(REQUIRED);

                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8080));
                assert_eq!(
                    matches.get_one::<String>(ARG_REMOTE_USER_HEADER).cloned(),
                    Some("X-Remote-User".to_string())
                );
                assert_eq!(matches.get_one::<u64>(ARG_UPSTREAM_TIMEOUT).copied(), Some(10));
                assert_eq!(
                    matches.get_one::<String>(ldap::ARG_LDAP_URI).cloned(),
                    Some("ldap://localhost".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(ldap::ARG_LDAP_BASE_DN).cloned(),
                    Some("DC=example,DC=com".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(ldap::ARG_LDAP_FILTER).cloned(),
                    Some("(cn={username})".to_string())
                );
                assert_eq!(matches.get_one::<u64>(cache::ARG_CACHE_TTL).copied(), Some(300));
            },
        );
    }

    #[test]
    fn test_missing_duo_credentials() {
        temp_env::with_vars_unset(
            ["MFA_STATUS_DUO_IKEY", "MFA_STATUS_DUO_SKEY", "MFA_STATUS_DUO_HOST"],
            || {
                let result = new().try_get_matches_from(["mfa-status"]);
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("MFA_STATUS_DUO_IKEY", Some("DIXXXXXXXXXXXXXXXXXX")),
                ("MFA_STATUS_DUO_SKEY", Some("secret")),
                ("MFA_STATUS_DUO_HOST", Some("api-xxxxxxxx.duosecurity.com")),
                ("MFA_STATUS_PORT", Some("443")),
                ("MFA_STATUS_CACHE", Some("/run/redis/redis.sock")),
                ("MFA_STATUS_CACHE_TTL", Some("60")),
                ("MFA_STATUS_LOCKED_GROUP", Some("CN=Locked,DC=example,DC=com")),
                ("MFA_STATUS_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(["mfa-status"]);

                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>(duo::ARG_DUO_HOST).cloned(),
                    Some("api-xxxxxxxx.duosecurity.com".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(cache::ARG_CACHE).cloned(),
                    Some("/run/redis/redis.sock".to_string())
                );
                assert_eq!(matches.get_one::<u64>(cache::ARG_CACHE_TTL).copied(), Some(60));
                assert_eq!(
                    matches.get_one::<String>(ldap::ARG_LOCKED_GROUP).cloned(),
                    Some("CN=Locked,DC=example,DC=com".to_string())
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        temp_env::with_vars_unset(["MFA_STATUS_CACHE_TTL"], || {
            let mut args = REQUIRED.to_vec();
            args.extend(["--cache-ttl", "0"]);
            assert!(new().try_get_matches_from(args).is_err());
        });
    }

    #[test]
    fn test_ttl_above_one_week_is_rejected() {
        temp_env::with_vars_unset(["MFA_STATUS_CACHE_TTL"], || {
            let mut args = REQUIRED.to_vec();
            args.extend(["--cache-ttl", "604801"]);
            assert!(new().try_get_matches_from(args.clone()).is_err());

            let mut args = REQUIRED.to_vec();
            args.extend(["--cache-ttl", "604800"]);
            let matches = new()
                .try_get_matches_from(args)
                .unwrap_or_else(|err| panic!("parse failed: {err}"));
            assert_eq!(
                matches.get_one::<u64>(cache::ARG_CACHE_TTL).copied(),
                Some(604_800)
            );
        });
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, level) in (0u8..).zip(levels) {
            temp_env::with_vars([("MFA_STATUS_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(REQUIRED);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(index)
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for count in 1u8..=4 {
            temp_env::with_vars([("MFA_STATUS_LOG_LEVEL", None::<String>)], || {
                let mut args: Vec<String> = REQUIRED.iter().map(ToString::to_string).collect();
                args.push(format!("-{}", "v".repeat(usize::from(count))));

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(count)
                );
            });
        }
    }
}
