use super::{UnifiedStatus, merge};
use crate::{
    directory::{DirectoryConnection, DirectorySource},
    duo::{MfaRecord, MfaSource},
    error::ResolveError,
    retry::RetryPolicy,
};
use tracing::{debug, info, instrument, warn};

/// Resolves a username against both sources. Holds no cache.
pub struct Aggregator<M, D> {
    mfa: M,
    directory: D,
    retry: RetryPolicy,
    locked_group: Option<String>,
}

impl<M, D> Aggregator<M, D>
where
    M: MfaSource,
    D: DirectorySource,
{
    pub fn new(mfa: M, directory: D, locked_group: Option<String>) -> Self {
        Self {
            mfa,
            directory,
            retry: RetryPolicy::default(),
            locked_group: locked_group.filter(|group| !group.is_empty()),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the unified status for `username`.
    ///
    /// The directory connection is opened once, shared by every search attempt and
    /// released before returning. Both sources are queried concurrently.
    ///
    /// # Errors
    /// [`ResolveError::SourceUnavailable`] if the directory cannot be reached or bound,
    /// [`ResolveError::AggregationFailed`] if the directory has no usable entry after retries.
    /// MFA failures never fail the resolve.
    #[instrument(skip(self))]
    pub async fn resolve(&self, username: &str) -> Result<UnifiedStatus, ResolveError> {
        let connection = self
            .directory
            .connect()
            .await
            .map_err(ResolveError::SourceUnavailable)?;

        let (mfa, directory) = tokio::join!(
            self.lookup_mfa(username),
            self.retry.execute(|| connection.search(username)),
        );

        connection.close().await;

        let directory = directory.map_err(|source| {
            warn!("Directory lookup for {} failed: {}", username, source.last());
            ResolveError::AggregationFailed {
                username: username.to_string(),
                source,
            }
        })?;

        debug!(active = mfa.is_some(), "merging sources");

        Ok(merge(mfa, directory, self.locked_group.as_deref()))
    }

    async fn lookup_mfa(&self, username: &str) -> Option<MfaRecord> {
        match self.retry.execute(|| self.mfa.lookup(username)).await {
            Ok(record) => Some(record),
            Err(err) if err.last().is_not_found() => {
                info!("No MFA account for {}", username);
                None
            }
            Err(err) => {
                warn!("MFA lookup for {} failed: {}", username, err.last());
                None
            }
        }
    }
}
