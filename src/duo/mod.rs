//! MFA source: the Duo Admin API.

pub mod models;
pub mod sign;

pub use self::models::{AccountStatus, BypassCode, MfaRecord, Phone, Token, WebAuthnCredential};

use self::models::Envelope;
use crate::{APP_USER_AGENT, error::SourceError};
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, DATE},
};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use std::{future::Future, time::Duration};
use tracing::{Instrument, debug, info_span, instrument, warn};

/// Lookup of a user's MFA enrollment, as consumed by the aggregator.
pub trait MfaSource: Send + Sync {
    /// First MFA account matching `username`, in upstream order.
    ///
    /// An empty match list is reported as [`SourceError::NotFound`] so the retry
    /// policy can ride out directory-sync lag on the upstream side.
    fn lookup(&self, username: &str) -> impl Future<Output = Result<MfaRecord, SourceError>> + Send;
}

#[derive(Clone, Debug)]
pub struct DuoConfig {
    pub ikey: String,
    pub skey: SecretString,
    pub host: String,
    pub timeout: Duration,
}

/// Read-only Duo Admin API client.
#[derive(Clone, Debug)]
pub struct DuoClient {
    http: Client,
    config: DuoConfig,
    base_url: String,
}

impl DuoClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: DuoConfig) -> anyhow::Result<Self> {
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;
        let base_url = format!("https://{}", config.host);

        Ok(Self {
            http,
            config,
            base_url,
        })
    }

    /// Send requests to `base_url` while still signing for the configured host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// All Duo users whose username (or alias) matches.
    ///
    /// # Errors
    /// Returns a [`SourceError`] classified for the retry policy.
    #[instrument(skip(self))]
    pub async fn users_by_name(&self, username: &str) -> Result<Vec<MfaRecord>, SourceError> {
        self.get("/admin/v1/users", &[("username", username)]).await
    }

    /// # Errors
    /// Returns a [`SourceError`] classified for the retry policy.
    #[instrument(skip(self))]
    pub async fn bypass_codes(&self, user_id: &str) -> Result<Vec<BypassCode>, SourceError> {
        self.get(&format!("/admin/v1/users/{user_id}/bypass_codes"), &[])
            .await
    }

    /// # Errors
    /// Returns a [`SourceError`] classified for the retry policy.
    #[instrument(skip(self))]
    pub async fn phones(&self, user_id: &str) -> Result<Vec<Phone>, SourceError> {
        self.get(&format!("/admin/v1/users/{user_id}/phones"), &[])
            .await
    }

    /// # Errors
    /// Returns a [`SourceError`] classified for the retry policy.
    #[instrument(skip(self))]
    pub async fn tokens(&self, user_id: &str) -> Result<Vec<Token>, SourceError> {
        self.get(&format!("/admin/v1/users/{user_id}/tokens"), &[])
            .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let date = sign::request_date()
            .map_err(|e| SourceError::Rejected(format!("cannot format request date: {e}")))?;
        let query = sign::canonical_params(params);
        let canonical = sign::canonical_request(&date, "GET", &self.config.host, path, &query);
        let authorization = sign::authorization(&self.config.ikey, &self.config.skey, &canonical);

        let url = if query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query}", self.base_url)
        };

        let span = info_span!("duo.request", http.method = "GET", url = %path);
        let request = async {
            let response = self
                .http
                .get(&url)
                .header(DATE, &date)
                .header(AUTHORIZATION, authorization)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.config.timeout, request)
            .instrument(span)
            .await
            .map_err(|_| SourceError::Timeout(self.config.timeout))?
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        debug!(%status, "duo response for {}", path);

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::Unavailable(format!("{path} - {status}")));
        }

        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(Envelope::Ok { response }) => Ok(response),
            Ok(Envelope::Fail {
                code,
                message,
                message_detail,
            }) => Err(SourceError::Rejected(format!(
                "{path} - {status}, {}: {message}{}",
                code.map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                message_detail.map_or_else(String::new, |d| format!(" ({d})"))
            ))),
            Err(_) if !status.is_success() => {
                Err(SourceError::Rejected(format!("{path} - {status}")))
            }
            Err(e) => Err(SourceError::InvalidResponse(format!("{path}: {e}"))),
        }
    }
}

impl MfaSource for DuoClient {
    async fn lookup(&self, username: &str) -> Result<MfaRecord, SourceError> {
        let mut record = self
            .users_by_name(username)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(username.to_string()))?;

        if record.phones.is_none() {
            record.phones = Some(self.phones(&record.user_id).await?);
        }

        if record.tokens.is_none() {
            record.tokens = Some(self.tokens(&record.user_id).await?);
        }

        match self.bypass_codes(&record.user_id).await {
            Ok(codes) => record.bypass_codes = codes,
            Err(e) => warn!(user_id = %record.user_id, "Could not fetch bypass codes: {}", e),
        }

        Ok(record)
    }
}
