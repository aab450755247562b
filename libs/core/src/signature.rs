//! Slack request signing verification.
//!
//! Slack signs every Events API delivery with
//! `v0=hex(hmac_sha256(secret, "v0:{timestamp}:{body}"))` in the
//! `X-Slack-Signature` header. Verification is a pure function of the
//! headers, the body, the secret, and the current time.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";

/// Accept timestamps at most this many seconds away from current time,
/// in either direction. Five minutes is Slack's own recommendation for
/// replay protection.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// Body bytes that have passed the signing check. The only constructor is
/// a successful [`verify_at`], so downstream code can require proof of
/// verification in its signature.
#[derive(Debug, Clone, Copy)]
pub struct VerifiedBody<'a>(&'a [u8]);

impl<'a> VerifiedBody<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

/// Verify against the current wall clock.
pub fn verify<'a>(
    secret: &str,
    headers: &HeaderMap,
    body: &'a [u8],
) -> Result<VerifiedBody<'a>, AuthError> {
    verify_at(secret, headers, body, OffsetDateTime::now_utc())
}

/// Verify a delivery signed with `secret` as of `now`.
pub fn verify_at<'a>(
    secret: &str,
    headers: &HeaderMap,
    body: &'a [u8],
    now: OffsetDateTime,
) -> Result<VerifiedBody<'a>, AuthError> {
    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
    let signature = header_str(headers, SIGNATURE_HEADER)?;

    let seconds: i64 = timestamp.parse().map_err(|_| AuthError::BadTimestamp)?;
    // abs_diff: the header is attacker-controlled, so plain subtraction
    // could overflow on extreme values.
    if now.unix_timestamp().abs_diff(seconds) > REPLAY_WINDOW_SECS as u64 {
        return Err(AuthError::StaleTimestamp);
    }

    let provided = signature
        .strip_prefix("v0=")
        .ok_or(AuthError::BadSignature)?;
    let provided = hex::decode(provided).map_err(|_| AuthError::BadSignature)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::Mismatch)?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    if bool::from(expected.as_slice().ct_eq(&provided)) {
        Ok(VerifiedBody(body))
    } else {
        Err(AuthError::Mismatch)
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &'static str) -> Result<&'h str, AuthError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingHeader(name))
}
