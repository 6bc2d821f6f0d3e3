use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_DUO_IKEY: &str = "duo-ikey";
pub const ARG_DUO_SKEY: &str = "duo-skey";
pub const ARG_DUO_HOST: &str = "duo-host";

#[derive(Debug, Clone)]
pub struct Options {
    pub ikey: String,
    pub skey: SecretString,
    pub host: String,
}

impl Options {
    /// Parse Duo Admin API arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let required = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            ikey: required(ARG_DUO_IKEY)?,
            skey: SecretString::from(required(ARG_DUO_SKEY)?),
            host: required(ARG_DUO_HOST)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DUO_IKEY)
                .long(ARG_DUO_IKEY)
                .help("Duo Admin API integration key")
                .env("MFA_STATUS_DUO_IKEY")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DUO_SKEY)
                .long(ARG_DUO_SKEY)
                .help("Duo Admin API secret key")
                .env("MFA_STATUS_DUO_SKEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_DUO_HOST)
                .long(ARG_DUO_HOST)
                .help("Duo Admin API hostname, example: api-xxxxxxxx.duosecurity.com")
                .env("MFA_STATUS_DUO_HOST")
                .required(true),
        )
}
