//! Duo Admin API request signing (canonical request, v2).
//!
//! ```text
//! date \n METHOD \n host \n path \n key=value&key=value
//! ```
//!
//! Parameters are sorted and percent-encoded with the RFC 3986 unreserved set.
//! The canonical string is signed with HMAC-SHA512 keyed by the secret key and
//! sent as HTTP Basic credentials `ikey:hex(signature)`.

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use time::{OffsetDateTime, format_description::well_known::Rfc2822};

type HmacSha512 = Hmac<Sha512>;

/// Current time in the RFC 2822 form Duo expects in the `Date` header.
///
/// # Errors
/// Returns an error if the timestamp cannot be formatted.
pub fn request_date() -> Result<String, time::error::Format> {
    OffsetDateTime::now_utc().format(&Rfc2822)
}

fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Sorted, encoded query string. Also used verbatim as the request query.
#[must_use]
pub fn canonical_params(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (encode(key), encode(value)))
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[must_use]
pub fn canonical_request(date: &str, method: &str, host: &str, path: &str, params: &str) -> String {
    [
        date,
        &method.to_ascii_uppercase(),
        &host.to_ascii_lowercase(),
        path,
        params,
    ]
    .join("\n")
}

#[must_use]
pub fn signature(skey: &SecretString, canonical: &str) -> String {
    // HMAC accepts keys of any length, so this branch is unreachable in practice.
    let Ok(mut mac) = HmacSha512::new_from_slice(skey.expose_secret().as_bytes()) else {
        return String::new();
    };
    mac.update(canonical.as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

/// Value for the `Authorization` header of a signed request.
#[must_use]
pub fn authorization(ikey: &str, skey: &SecretString, canonical: &str) -> String {
    let credentials = format!("{ikey}:{}", signature(skey, canonical));

    format!("Basic {}", Base64::encode_string(credentials.as_bytes()))
}
