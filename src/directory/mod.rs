//! Directory source: LDAP bind and subtree search.

mod record;

pub use self::record::DirectoryRecord;

use crate::error::SourceError;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, ldap_escape};
use secrecy::{ExposeSecret, SecretString};
use std::{future::Future, time::Duration};
use tracing::{debug, instrument, warn};

/// Attributes requested from the directory, and nothing else.
pub const ATTRIBUTES: [&str; 5] = ["mail", "sn", "title", "givenName", "memberOf"];

pub const USERNAME_PLACEHOLDER: &str = "{username}";

// LDAP result codes the server uses for "try again later".
const RC_BUSY: u32 = 51;
const RC_UNAVAILABLE: u32 = 52;

/// Source of directory connections. One connection serves one resolve.
pub trait DirectorySource: Send + Sync {
    type Connection: DirectoryConnection;

    /// Open and bind a connection.
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, SourceError>> + Send;
}

pub trait DirectoryConnection: Send + Sync {
    /// Entry for `username`; an empty result is [`SourceError::NotFound`].
    fn search(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<DirectoryRecord, SourceError>> + Send;

    /// Release the connection. Dropping it releases it too, without the unbind.
    fn close(self) -> impl Future<Output = ()> + Send;
}

#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    pub uri: String,
    pub bind_dn: Option<String>,
    pub bind_password: Option<SecretString>,
    pub base_dn: String,
    pub filter: String,
    pub timeout: Duration,
}

impl DirectoryConfig {
    /// DN and password for the simple bind. Empty DN and password bind anonymously.
    #[must_use]
    pub fn bind_credentials(&self) -> (&str, &str) {
        match self.bind_dn.as_deref().filter(|dn| !dn.is_empty()) {
            Some(dn) => (
                dn,
                self.bind_password
                    .as_ref()
                    .map(|password| password.expose_secret())
                    .unwrap_or_default(),
            ),
            None => ("", ""),
        }
    }
}

/// Substitute the escaped username into the filter template.
#[must_use]
pub fn render_filter(template: &str, username: &str) -> String {
    template.replace(USERNAME_PLACEHOLDER, &ldap_escape(username))
}

fn classify(err: ldap3::LdapError) -> SourceError {
    match err {
        ldap3::LdapError::LdapResult { result } => match result.rc {
            RC_BUSY | RC_UNAVAILABLE => {
                SourceError::Unavailable(format!("rc={}: {}", result.rc, result.text))
            }
            rc => SourceError::Rejected(format!("rc={rc}: {}", result.text)),
        },
        ldap3::LdapError::FilterParsing => {
            SourceError::Rejected("invalid search filter".to_string())
        }
        err @ (ldap3::LdapError::OpSend { .. }
        | ldap3::LdapError::ResultRecv { .. }
        | ldap3::LdapError::EndOfStream
        | ldap3::LdapError::Io { .. }) => SourceError::ConnectionLost(err.to_string()),
        other => SourceError::Unavailable(other.to_string()),
    }
}

/// Record of the first entry; no entries is a (retryable) [`SourceError::NotFound`].
fn first_record(
    entries: impl IntoIterator<Item = SearchEntry>,
    username: &str,
) -> Result<DirectoryRecord, SourceError> {
    entries
        .into_iter()
        .next()
        .map(|entry| {
            debug!(dn = %entry.dn, "directory entry found");
            DirectoryRecord::from_attributes(&entry.attrs)
        })
        .ok_or_else(|| SourceError::NotFound(username.to_string()))
}

#[derive(Clone, Debug)]
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    #[must_use]
    pub const fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }
}

impl DirectorySource for LdapDirectory {
    type Connection = LdapConnection;

    #[instrument(skip(self), fields(uri = %self.config.uri))]
    async fn connect(&self) -> Result<LdapConnection, SourceError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.timeout);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.uri)
            .await
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", self.config.uri)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection driver error: {}", e);
            }
        });

        let (dn, password) = self.config.bind_credentials();

        tokio::time::timeout(self.config.timeout, ldap.simple_bind(dn, password))
            .await
            .map_err(|_| SourceError::Timeout(self.config.timeout))?
            .map_err(|e| SourceError::Unavailable(e.to_string()))?
            .success()
            .map_err(|e| SourceError::Bind(e.to_string()))?;

        debug!(anonymous = dn.is_empty(), "LDAP bind succeeded");

        Ok(LdapConnection {
            ldap,
            base_dn: self.config.base_dn.clone(),
            filter: self.config.filter.clone(),
            timeout: self.config.timeout,
        })
    }
}

/// Bound connection, owned by a single resolve.
pub struct LdapConnection {
    ldap: Ldap,
    base_dn: String,
    filter: String,
    timeout: Duration,
}

impl DirectoryConnection for LdapConnection {
    #[instrument(skip(self), fields(base_dn = %self.base_dn))]
    async fn search(&self, username: &str) -> Result<DirectoryRecord, SourceError> {
        let filter = render_filter(&self.filter, username);
        let mut ldap = self.ldap.clone();

        let (entries, _result) = tokio::time::timeout(
            self.timeout,
            ldap.search(&self.base_dn, Scope::Subtree, &filter, ATTRIBUTES.to_vec()),
        )
        .await
        .map_err(|_| SourceError::Timeout(self.timeout))?
        .map_err(classify)?
        .success()
        .map_err(classify)?;

        first_record(
            entries
                .into_iter()
                .filter(|entry| !entry.is_ref())
                .map(SearchEntry::construct),
            username,
        )
    }

    async fn close(mut self) {
        if let Err(e) = self.ldap.unbind().await {
            debug!("LDAP unbind failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn filter_substitutes_username() {
        assert_eq!(render_filter("(cn={username})", "jdoe"), "(cn=jdoe)");
        assert_eq!(
            render_filter("(&(objectClass=person)(|(cn={username})(uid={username})))", "jdoe"),
            "(&(objectClass=person)(|(cn=jdoe)(uid=jdoe)))"
        );
    }

    #[test]
    fn filter_escapes_special_characters() {
        let escaped = |name| render_filter("(cn={username})", name).to_ascii_lowercase();

        assert_eq!(escaped("j*"), "(cn=j\\2a)");
        assert_eq!(escaped("(admin)\\"), "(cn=\\28admin\\29\\5c)");
    }

    #[test]
    fn busy_server_is_transient() {
        let err = classify(ldap3::LdapError::LdapResult {
            result: ldap3::LdapResult {
                rc: RC_BUSY,
                matched: String::new(),
                text: "busy".to_string(),
                refs: Vec::new(),
                ctrls: Vec::new(),
            },
        });
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[test]
    fn other_result_codes_are_permanent() {
        let err = classify(ldap3::LdapError::LdapResult {
            result: ldap3::LdapResult {
                rc: 32,
                matched: String::new(),
                text: "no such object".to_string(),
                refs: Vec::new(),
                ctrls: Vec::new(),
            },
        });
        assert!(matches!(err, SourceError::Rejected(_)));
    }

    #[test]
    fn dead_connection_is_not_retried() {
        let err = classify(ldap3::LdapError::EndOfStream);
        assert!(matches!(err, SourceError::ConnectionLost(_)));
        assert_eq!(err.kind(), crate::error::FaultKind::Permanent);
    }

    fn config(bind_dn: Option<&str>, bind_password: Option<&str>) -> DirectoryConfig {
        DirectoryConfig {
            uri: "ldap://127.0.0.1:1".to_string(),
            bind_dn: bind_dn.map(ToString::to_string),
            bind_password: bind_password.map(|p| SecretString::from(p.to_string())),
            base_dn: "DC=example,DC=com".to_string(),
            filter: "(cn={username})".to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn anonymous_bind_without_dn() {
        assert_eq!(config(None, None).bind_credentials(), ("", ""));
        assert_eq!(config(Some(""), Some("ignored")).bind_credentials(), ("", ""));
    }

    #[test]
    fn authenticated_bind_with_dn() {
        let config = config(Some("CN=svc,DC=example,DC=com"), Some("s3cret"));
        assert_eq!(
            config.bind_credentials(),
            ("CN=svc,DC=example,DC=com", "s3cret")
        );
    }

    #[test]
    fn first_entry_wins_and_empty_is_not_found() {
        let entry = |dn: &str, given_name: &str| SearchEntry {
            dn: dn.to_string(),
            attrs: HashMap::from([("givenName".to_string(), vec![given_name.to_string()])]),
            bin_attrs: HashMap::new(),
        };

        let record = first_record(
            vec![
                entry("CN=jdoe,DC=example,DC=com", "Jane"),
                entry("CN=jdoe2,DC=example,DC=com", "Janet"),
            ],
            "jdoe",
        )
        .unwrap_or_else(|err| panic!("lookup failed: {err}"));
        assert_eq!(record.given_name.as_deref(), Some("Jane"));

        let err = first_record(Vec::new(), "ghost").err();
        assert!(matches!(err, Some(SourceError::NotFound(name)) if name == "ghost"));
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let directory = LdapDirectory::new(config(None, None));

        let result = directory.connect().await;
        assert!(matches!(result, Err(SourceError::Unavailable(_))));
    }
}
