use crate::directory::USERNAME_PLACEHOLDER;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_LDAP_URI: &str = "ldap-uri";
pub const ARG_LDAP_BIND_DN: &str = "ldap-bind-dn";
pub const ARG_LDAP_PASSWORD: &str = "ldap-password";
pub const ARG_LDAP_BASE_DN: &str = "ldap-base-dn";
pub const ARG_LDAP_FILTER: &str = "ldap-filter";
pub const ARG_LOCKED_GROUP: &str = "locked-group";

#[derive(Debug, Clone)]
pub struct Options {
    pub uri: String,
    pub bind_dn: Option<String>,
    pub password: Option<SecretString>,
    pub base_dn: String,
    pub filter: String,
    pub locked_group: Option<String>,
}

impl Options {
    /// Parse directory arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the filter lacks the username placeholder or a
    /// password is given without a bind DN.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // clap passes empty env values through
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let filter = get_non_empty(ARG_LDAP_FILTER)
            .unwrap_or_else(|| format!("(cn={USERNAME_PLACEHOLDER})"));
        if !filter.contains(USERNAME_PLACEHOLDER) {
            anyhow::bail!("--{ARG_LDAP_FILTER} must contain {USERNAME_PLACEHOLDER}");
        }

        let bind_dn = get_non_empty(ARG_LDAP_BIND_DN);
        let password = get_non_empty(ARG_LDAP_PASSWORD).map(SecretString::from);
        if password.is_some() && bind_dn.is_none() {
            anyhow::bail!("--{ARG_LDAP_PASSWORD} requires --{ARG_LDAP_BIND_DN}");
        }

        Ok(Self {
            uri: get_non_empty(ARG_LDAP_URI).unwrap_or_else(|| "ldap://localhost".to_string()),
            bind_dn,
            password,
            base_dn: get_non_empty(ARG_LDAP_BASE_DN)
                .unwrap_or_else(|| "DC=example,DC=com".to_string()),
            filter,
            locked_group: get_non_empty(ARG_LOCKED_GROUP),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LDAP_URI)
                .long(ARG_LDAP_URI)
                .help("LDAP server URI (ldap:// or ldaps://)")
                .env("MFA_STATUS_LDAP_URI")
                .default_value("ldap://localhost"),
        )
        .arg(
            Arg::new(ARG_LDAP_BIND_DN)
                .long(ARG_LDAP_BIND_DN)
                .help("DN to bind as, anonymous bind when unset")
                .env("MFA_STATUS_LDAP_BIND_DN"),
        )
        .arg(
            Arg::new(ARG_LDAP_PASSWORD)
                .long(ARG_LDAP_PASSWORD)
                .help("Password for the bind DN")
                .env("MFA_STATUS_LDAP_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_LDAP_BASE_DN)
                .long(ARG_LDAP_BASE_DN)
                .help("Search base DN")
                .env("MFA_STATUS_LDAP_BASE_DN")
                .default_value("DC=example,DC=com"),
        )
        .arg(
            Arg::new(ARG_LDAP_FILTER)
                .long(ARG_LDAP_FILTER)
                .help("Search filter, {username} is replaced with the escaped username")
                .env("MFA_STATUS_LDAP_FILTER")
                .default_value("(cn={username})"),
        )
        .arg(
            Arg::new(ARG_LOCKED_GROUP)
                .long(ARG_LOCKED_GROUP)
                .help("DN of the group whose members are reported as locked")
                .env("MFA_STATUS_LOCKED_GROUP"),
        )
}
