//! Webhook signature verification (HMAC-SHA256).
//!
//! The provider signs `"{timestamp}.{raw body}"` with the shared webhook
//! secret and sends `t=<ts>,v1=<hex>` in the signature header. Verification
//! uses a constant-time comparison and rejects stale timestamps.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Maximum allowed age of an event, in seconds.
const REPLAY_WINDOW_SECS: i64 = 300;

/// Verify a provider webhook signature against the raw request body.
pub fn verify_event_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }

    if timestamp.is_empty() || signature.is_empty() {
        return Err("Invalid signature header");
    }

    let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap_or(""));
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(signed_payload.as_bytes());

    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")?;

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now_secs - ts).abs() > REPLAY_WINDOW_SECS {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

/// Produce a `t=...,v1=...` header for a payload. Used by tests and tooling
/// to emit events the verifier accepts.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp_secs: i64) -> String {
    let signed_payload = format!(
        "{timestamp_secs}.{}",
        std::str::from_utf8(payload).unwrap_or("")
    );
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(signed_payload.as_bytes());
    let digest = mac.finalize().into_bytes();

    format!("t={},v1={}", timestamp_secs, hex::encode(digest))
}
