//! # mfa-status (Unified MFA Status)
//!
//! `mfa-status` answers one question for an already authenticated user: what does
//! their multi-factor setup look like right now? The answer combines two
//! independent identity sources:
//!
//! - **Duo Admin API**: enrollment state, phones, hardware/software tokens,
//!   WebAuthn credentials and bypass codes.
//! - **LDAP directory**: given name, surname, title, mail and group membership.
//!   Membership in the configured *locked group* marks the account as locked.
//!
//! ## Aggregation
//!
//! Both sources are queried concurrently through a bounded [`retry::RetryPolicy`]
//! (3 attempts, 3s fixed delay plus up to 2s of jitter). The two sources are not
//! equal:
//!
//! - A user without a Duo account (or a Duo outage) still yields a status with
//!   `active = false` and no Duo-sourced fields.
//! - Without directory data there is no result at all, since the locked-account
//!   check is directory-sourced.
//!
//! Names, title and mail prefer the Duo value and fall back to the directory.
//!
//! ## Caching
//!
//! Unified records are cached (cache-aside) by username with a mandatory TTL,
//! either in Redis or in process memory. The aggregator itself never touches the
//! cache; see [`status::StatusService`].

pub mod api;
pub mod cache;
pub mod cli;
pub mod directory;
pub mod duo;
pub mod error;
pub mod retry;
pub mod status;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
