//! Verification of signed webhook deliveries.
//!
//! The signature header has the form `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`, where each
//! `v1` value is HMAC-SHA256 over `"{t}.{payload}"` keyed by the endpoint secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Default accepted clock skew.
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebhookError {
    #[error("No stripe-signature header value was provided.")]
    MissingHeader,
    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,
    #[error("No signatures found matching the expected signature for payload")]
    NoMatchingSignature,
    #[error("Timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,
    #[error("No webhook signing secret is configured")]
    MissingSecret,
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// A verified event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// `id` of the embedded object, which for `payment_intent.*` events is the intent id.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(payload: &[u8], timestamp: i64, secret: &str) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Builds a header value for `payload`, as a sender would.
pub fn signature_header(payload: &[u8], timestamp: i64, secret: &str) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        compute_signature(payload, timestamp, secret)
    )
}

fn parse_header(header: &str) -> Result<(i64, Vec<&str>), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| WebhookError::MalformedHeader)?)
            }
            (Some("v1"), Some(value)) => signatures.push(value),
            _ => {}
        }
    }

    match timestamp {
        Some(t) if !signatures.is_empty() => Ok((t, signatures)),
        _ => Err(WebhookError::MalformedHeader),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Checks `header` against `payload` and `secret` at time `now`.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: u64,
    now: i64,
) -> Result<(), WebhookError> {
    if header.trim().is_empty() {
        return Err(WebhookError::MissingHeader);
    }
    if secret.is_empty() {
        return Err(WebhookError::MissingSecret);
    }

    let (timestamp, signatures) = parse_header(header)?;
    let expected = compute_signature(payload, timestamp, secret);

    if !signatures
        .iter()
        .any(|sig| constant_time_eq(sig.as_bytes(), expected.as_bytes()))
    {
        return Err(WebhookError::NoMatchingSignature);
    }

    if (now - timestamp).unsigned_abs() > tolerance_secs {
        return Err(WebhookError::TimestampOutsideTolerance);
    }

    Ok(())
}

/// Verifies the delivery and parses the event body.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: u64,
    now: i64,
) -> Result<WebhookEvent, WebhookError> {
    verify(payload, header, secret, tolerance_secs, now)?;
    serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn payload() -> Vec<u8> {
        br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_123"}}}"#
            .to_vec()
    }

    #[test]
    fn accepts_valid_signature() {
        let body = payload();
        let header = signature_header(&body, NOW, SECRET);
        let event = construct_event(&body, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.object_id(), Some("pi_123"));
    }

    #[test]
    fn accepts_any_matching_v1_entry() {
        let body = payload();
        let good = compute_signature(&body, NOW, SECRET);
        let header = format!("t={},v1=deadbeef,v0=ignored,v1={}", NOW, good);
        assert!(verify(&body, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_ok());
    }

    #[test]
    fn rejects_tampered_payload_and_wrong_secret() {
        let body = payload();
        let header = signature_header(&body, NOW, SECRET);
        assert_matches!(
            verify(b"{}", &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(WebhookError::NoMatchingSignature)
        );
        assert_matches!(
            verify(&body, &header, "whsec_other", DEFAULT_TOLERANCE_SECS, NOW),
            Err(WebhookError::NoMatchingSignature)
        );
    }

    #[test]
    fn enforces_tolerance_window() {
        let body = payload();
        let header = signature_header(&body, NOW - 301, SECRET);
        assert_matches!(
            verify(&body, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(WebhookError::TimestampOutsideTolerance)
        );

        let header = signature_header(&body, NOW - 299, SECRET);
        assert!(verify(&body, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_ok());
    }

    #[test]
    fn rejects_malformed_headers() {
        let body = payload();
        assert_matches!(
            verify(&body, "", SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(WebhookError::MissingHeader)
        );
        assert_matches!(
            verify(&body, "garbage", SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(WebhookError::MalformedHeader)
        );
        assert_matches!(
            verify(&body, "t=abc,v1=00", SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(WebhookError::MalformedHeader)
        );
    }
}
