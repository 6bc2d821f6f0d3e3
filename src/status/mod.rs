//! Unified status record and the rules that merge the two sources into it.

mod aggregator;
mod service;
#[cfg(test)]
pub(crate) mod testing;

pub use self::{aggregator::Aggregator, service::StatusService};

use crate::{
    directory::DirectoryRecord,
    duo::{AccountStatus, BypassCode, MfaRecord, Phone, Token, WebAuthnCredential},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Merged view of one user, as cached and returned by `GET /status`.
///
/// When `active` is false every MFA-sourced field is absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnifiedStatus {
    /// The user has an MFA account.
    pub active: bool,
    /// The user is a member of the configured locked group.
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enrolled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_directory_sync: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<Phone>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<Token>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webauthncredentials: Option<Vec<WebAuthnCredential>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_codes: Option<Vec<BypassCode>>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn prefer(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    present(primary).or_else(|| present(fallback))
}

/// Combine both sources.
///
/// MFA values win for names, title and mail, the directory fills the gaps.
/// `locked` comes from directory group membership only and is false when no
/// locked group is configured.
#[must_use]
pub fn merge(
    mfa: Option<MfaRecord>,
    directory: DirectoryRecord,
    locked_group: Option<&str>,
) -> UnifiedStatus {
    let locked = locked_group.is_some_and(|group| directory.is_member_of(group));

    let DirectoryRecord {
        given_name,
        surname,
        title,
        mail,
        ..
    } = directory;

    let Some(mfa) = mfa else {
        return UnifiedStatus {
            active: false,
            locked,
            firstname: present(given_name),
            lastname: present(surname),
            title: present(title),
            mail: present(mail),
            ..UnifiedStatus::default()
        };
    };

    UnifiedStatus {
        active: true,
        locked,
        firstname: prefer(mfa.firstname, given_name),
        lastname: prefer(mfa.lastname, surname),
        title: prefer(mfa.title, title),
        mail: prefer(mfa.email, mail),
        created: mfa.created,
        is_enrolled: Some(mfa.is_enrolled),
        last_directory_sync: mfa.last_directory_sync,
        last_login: mfa.last_login,
        status: Some(mfa.status),
        phones: Some(mfa.phones.unwrap_or_default()),
        tokens: Some(mfa.tokens.unwrap_or_default()),
        webauthncredentials: Some(mfa.webauthncredentials),
        bypass_codes: Some(mfa.bypass_codes),
    }
}
