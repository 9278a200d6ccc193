use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::payment::errors::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Deliveries older (or newer) than this are rejected as replays.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verifies a `t=<unix>,v1=<hex>[,v1=<hex>...]` header over `payload`.
///
/// The signed message is `"{t}." ++ payload`. Any one matching `v1` entry is
/// accepted so secrets can be rolled.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_secs: i64,
    tolerance_secs: i64,
) -> Result<(), WebhookError> {
    if header.trim().is_empty() {
        return Err(WebhookError::MissingSignature);
    }

    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            candidates.push(v);
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature("missing timestamp"))?;
    if candidates.is_empty() {
        return Err(WebhookError::MalformedSignature("missing v1 signature"));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::MalformedSignature("invalid timestamp"))?;

    let mac = signed_mac(payload, timestamp, secret)?;

    let matched = candidates.iter().any(|hex_sig| {
        hex::decode(hex_sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    if (now_secs - ts).abs() > tolerance_secs {
        return Err(WebhookError::StaleTimestamp);
    }

    Ok(())
}

/// Produces a header `verify_signature` accepts. Used by the mock gateway.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookError> {
    let ts = timestamp.to_string();
    let mac = signed_mac(payload, &ts, secret)?;
    let sig = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={ts},v1={sig}"))
}

fn signed_mac(payload: &[u8], timestamp: &str, secret: &str) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::MalformedSignature("unusable signing key"))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_760_000_000;

    #[test]
    fn accepts_own_signature() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = sign(payload, SECRET, NOW).unwrap();

        verify_signature(payload, &header, SECRET, NOW + 10, DEFAULT_TOLERANCE_SECS).unwrap();
    }

    #[test]
    fn rejects_tampered_payload() {
        let header = sign(b"{\"amount\":100}", SECRET, NOW).unwrap();

        let err = verify_signature(b"{\"amount\":1}", &header, SECRET, NOW, 300).unwrap_err();
        assert!(matches!(err, WebhookError::SignatureMismatch));
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = sign(b"{}", "whsec_other", NOW).unwrap();

        let err = verify_signature(b"{}", &header, SECRET, NOW, 300).unwrap_err();
        assert!(matches!(err, WebhookError::SignatureMismatch));
    }

    #[test]
    fn rejects_replayed_delivery() {
        let header = sign(b"{}", SECRET, NOW).unwrap();

        let err = verify_signature(b"{}", &header, SECRET, NOW + 301, 300).unwrap_err();
        assert!(matches!(err, WebhookError::StaleTimestamp));
    }

    #[test]
    fn accepts_any_matching_v1_entry() {
        let good = sign(b"{}", SECRET, NOW).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1={good_sig}");

        verify_signature(b"{}", &header, SECRET, NOW, 300).unwrap();
    }

    #[test]
    fn rejects_header_without_parts() {
        assert!(matches!(
            verify_signature(b"{}", "v1=abcd", SECRET, NOW, 300),
            Err(WebhookError::MalformedSignature(_))
        ));
        assert!(matches!(
            verify_signature(b"{}", &format!("t={NOW}"), SECRET, NOW, 300),
            Err(WebhookError::MalformedSignature(_))
        ));
    }

    #[test]
    fn empty_header_is_missing_signature() {
        assert!(matches!(
            verify_signature(b"{}", "  ", SECRET, NOW, 300),
            Err(WebhookError::MissingSignature)
        ));
    }
}
