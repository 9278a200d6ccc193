use std::collections::HashMap;

use serde::Deserialize;

use crate::payment::GatewayEvent;
use crate::payment::errors::WebhookError;

/// Metadata key carrying the reservation id on every intent.
pub const RESERVATION_ID_KEY: &str = "reservationId";

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: StripeObject,
}

#[derive(Debug, Deserialize)]
pub struct StripeObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct StripeIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorEnvelope {
    pub error: StripeApiError,
}

#[derive(Debug, Deserialize)]
pub struct StripeApiError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Decodes an already-verified event body.
pub fn decode_event(payload: &[u8]) -> Result<GatewayEvent, WebhookError> {
    let event: StripeEvent = serde_json::from_slice(payload)
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    if event.event_type != PAYMENT_SUCCEEDED {
        return Ok(GatewayEvent::Other {
            event_type: event.event_type,
        });
    }

    let mut object = event.data.object;
    let intent_id = object
        .id
        .take()
        .ok_or_else(|| WebhookError::MalformedPayload("payment intent without id".into()))?;

    Ok(GatewayEvent::PaymentSucceeded {
        intent_id,
        reservation_id: object
            .metadata
            .take()
            .unwrap_or_default()
            .remove(RESERVATION_ID_KEY),
    })
}
