//! Typed views of the Duo Admin API payloads this service reads.
//!
//! Only the fields the status page shows are modelled; everything else in the
//! upstream JSON is ignored. The same types are serialized into the cache, so
//! every field round-trips through `serde_json`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Bypass,
    Disabled,
    #[serde(rename = "locked out")]
    LockedOut,
    #[serde(rename = "pending deletion")]
    PendingDeletion,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Phone {
    pub phone_id: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub activated: bool,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

/// Hardware or software OTP token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Token {
    pub token_id: String,
    #[serde(default)]
    pub serial: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub totp_step: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebAuthnCredential {
    pub webauthnkey: String,
    #[serde(default)]
    pub credential_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub date_added: Option<i64>,
}

/// Bypass code metadata. Duo never returns the codes themselves here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BypassCode {
    pub bypass_code_id: String,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub expiration: Option<i64>,
    #[serde(default)]
    pub reuse_count: Option<u32>,
    #[serde(default)]
    pub remaining_uses: Option<u32>,
}

/// One Duo user as returned by `GET /admin/v1/users?username=`.
///
/// `phones` and `tokens` stay `None` when the payload omits them, so the client
/// can tell "not sent" apart from "none enrolled".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MfaRecord {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub status: AccountStatus,
    #[serde(default)]
    pub is_enrolled: bool,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub last_directory_sync: Option<i64>,
    #[serde(default)]
    pub last_login: Option<i64>,
    #[serde(default)]
    pub phones: Option<Vec<Phone>>,
    #[serde(default)]
    pub tokens: Option<Vec<Token>>,
    #[serde(default)]
    pub webauthncredentials: Vec<WebAuthnCredential>,
    #[serde(default)]
    pub bypass_codes: Vec<BypassCode>,
}

/// Response wrapper shared by every Admin API endpoint.
#[derive(Debug, Deserialize)]
#[serde(tag = "stat")]
pub(crate) enum Envelope<T> {
    #[serde(rename = "OK")]
    Ok { response: T },
    #[serde(rename = "FAIL")]
    Fail {
        #[serde(default)]
        code: Option<u32>,
        #[serde(default)]
        message: String,
        #[serde(default)]
        message_detail: Option<String>,
    },
}
