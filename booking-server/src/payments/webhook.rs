//! Provider webhook verification and parsing
//!
//! Verifies the `t=...,v1=...` HMAC-SHA256 signature header, enforces a
//! freshness window, and parses the events the reconciliation core consumes.
//! Events are correlated to bookings through `metadata[booking_id]` on the
//! intent; an event missing that id is parsed but carries no booking id and
//! is ignored downstream rather than treated as fatal.

use ring::hmac;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Maximum accepted age of a webhook timestamp (seconds)
const SIGNATURE_MAX_AGE_SECS: i64 = 300;

/// Webhook verification/parsing errors
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing, stale, or non-matching signature. The only case the
    /// endpoint answers with a rejection.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("malformed webhook payload: {0}")]
    Malformed(String),
}

/// Event kinds the core applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    SetupIntentSucceeded,
    PaymentIntentSucceeded,
    Unknown(String),
}

impl From<&str> for WebhookEventKind {
    fn from(s: &str) -> Self {
        match s {
            "setup_intent.succeeded" => Self::SetupIntentSucceeded,
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Parsed webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Provider event id, used for exact-duplicate detection
    pub id: String,
    pub kind: WebhookEventKind,
    /// Booking id from intent metadata, if present
    pub booking_id: Option<u64>,
    /// Provider object id (setup intent or payment intent)
    pub object_id: String,
    /// Customer id on the object, if present
    pub customer_id: Option<String>,
    /// Reusable payment method (setup_intent.succeeded)
    pub payment_method_id: Option<String>,
    /// Object status as reported by the provider
    pub status: Option<String>,
    pub created: i64,
}

/// Webhook verifier holding the endpoint signing secret
#[derive(Clone)]
pub struct WebhookVerifier {
    key: hmac::Key,
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_ref()),
        }
    }

    /// Verify the signature header and parse the payload
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
        now_unix: i64,
    ) -> Result<WebhookEvent, WebhookError> {
        self.verify_signature(payload, signature, now_unix)?;
        parse_event(payload)
    }

    fn verify_signature(
        &self,
        payload: &[u8],
        signature: &str,
        now_unix: i64,
    ) -> Result<(), WebhookError> {
        // Header format: t=<unix>,v1=<hex hmac>
        let mut timestamp: Option<&str> = None;
        let mut sig_v1: Option<&str> = None;
        for part in signature.split(',') {
            if let Some((key, value)) = part.split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => sig_v1 = Some(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| WebhookError::InvalidSignature("missing timestamp".to_string()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| WebhookError::InvalidSignature("missing v1".to_string()))?;

        let payload_str = std::str::from_utf8(payload)
            .map_err(|_| WebhookError::Malformed("payload is not UTF-8".to_string()))?;
        let signed_payload = format!("{timestamp}.{payload_str}");

        let expected = hex::decode(sig_v1)
            .map_err(|_| WebhookError::InvalidSignature("v1 is not hex".to_string()))?;

        // ring's verify is constant-time
        hmac::verify(&self.key, signed_payload.as_bytes(), &expected)
            .map_err(|_| WebhookError::InvalidSignature("signature mismatch".to_string()))?;

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| WebhookError::InvalidSignature("bad timestamp".to_string()))?;
        if (now_unix - ts).abs() > SIGNATURE_MAX_AGE_SECS {
            return Err(WebhookError::InvalidSignature(
                "timestamp outside freshness window".to_string(),
            ));
        }

        Ok(())
    }

    /// Compute a valid signature header for a payload (testing aid)
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        let payload_str = std::str::from_utf8(payload).unwrap_or_default();
        let signed_payload = format!("{timestamp}.{payload_str}");
        let tag = hmac::sign(&self.key, signed_payload.as_bytes());
        format!("t={timestamp},v1={}", hex::encode(tag.as_ref()))
    }
}

fn parse_event(payload: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let raw: RawEvent =
        serde_json::from_slice(payload).map_err(|e| WebhookError::Malformed(e.to_string()))?;

    let object = raw.data.object;
    let booking_id = object
        .metadata
        .as_ref()
        .and_then(|m| m.booking_id.as_deref())
        .and_then(|s| s.parse::<u64>().ok());

    if booking_id.is_none() {
        warn!(event_id = %raw.id, event_type = %raw.event_type, "Webhook event without booking_id metadata");
    }

    Ok(WebhookEvent {
        id: raw.id,
        kind: WebhookEventKind::from(raw.event_type.as_str()),
        booking_id,
        object_id: object.id,
        customer_id: object.customer,
        payment_method_id: object.payment_method,
        status: object.status,
        created: raw.created,
    })
}

// Raw provider event shapes

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: RawObject,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    id: String,
    customer: Option<String>,
    payment_method: Option<String>,
    status: Option<String>,
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    booking_id: Option<String>,
}
