//! Payment provider boundary.
//!
//! The reservation core needs exactly three things from a provider: create an
//! intent for an amount, cancel an intent it no longer needs, and verify and
//! decode a signed webhook delivery.

pub mod errors;
pub mod mock;
pub mod stripe;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::payment::errors::{GatewayError, WebhookError};

/// Metadata attached to an intent so a later notification can find its
/// reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntentMetadata {
    pub reservation_id: Uuid,
    pub restaurant_id: String,
    pub event_id: String,
    pub slot_id: String,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentRequest {
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub metadata: IntentMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentIntent {
    pub intent_id: String,
    /// Opaque token the client uses to complete payment.
    pub client_secret: String,
}

/// A verified provider notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    PaymentSucceeded {
        intent_id: String,
        /// Raw metadata value; parsed by the confirmation path.
        reservation_id: Option<String>,
    },
    Other {
        event_type: String,
    },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_intent(&self, req: &IntentRequest) -> Result<PaymentIntent, GatewayError>;

    async fn cancel_intent(&self, intent_id: &str) -> Result<(), GatewayError>;

    /// Verifies `signature` over the raw `payload` and decodes the event.
    fn parse_webhook(&self, payload: &[u8], signature: &str)
    -> Result<GatewayEvent, WebhookError>;
}
