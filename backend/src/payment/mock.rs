//! In-process payment gateway for development and tests.
//!
//! Intents are recorded instead of charged. Webhook payloads are produced and
//! verified with the same signature scheme as the Stripe adapter, so the full
//! confirmation path runs unchanged against it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use uuid::Uuid;

use crate::payment::errors::{GatewayError, WebhookError};
use crate::payment::stripe::signature::{DEFAULT_TOLERANCE_SECS, sign, verify_signature};
use crate::payment::stripe::types::{PAYMENT_SUCCEEDED, RESERVATION_ID_KEY, decode_event};
use crate::payment::{GatewayEvent, IntentRequest, PaymentGateway, PaymentIntent};

#[derive(Clone, Debug, Default)]
pub enum MockBehaviour {
    #[default]
    Succeed,
    /// Every call fails with `Unavailable`.
    Fail,
    /// Intent creation sleeps this long before succeeding.
    Delay(Duration),
}

#[derive(Default)]
pub struct MockPaymentGateway {
    webhook_secret: Option<String>,
    behaviour: Mutex<MockBehaviour>,
    created: Mutex<Vec<(PaymentIntent, IntentRequest)>>,
    cancelled: Mutex<Vec<String>>,
    seq: AtomicU64,
}

impl MockPaymentGateway {
    pub fn new(webhook_secret: Option<String>) -> Self {
        Self {
            webhook_secret,
            ..Default::default()
        }
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        *self.behaviour.lock() = behaviour;
    }

    pub fn created(&self) -> Vec<(PaymentIntent, IntentRequest)> {
        self.created.lock().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().clone()
    }

    /// Builds a signed `payment_intent.succeeded` delivery for `reservation_id`.
    /// Returns `(body, signature_header)`.
    pub fn succeeded_delivery(
        &self,
        intent_id: &str,
        reservation_id: &str,
    ) -> Result<(Vec<u8>, String), WebhookError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(WebhookError::MissingSecret)?;

        let body = json!({
            "id": format!("evt_mock_{}", Uuid::new_v4().simple()),
            "type": PAYMENT_SUCCEEDED,
            "data": {
                "object": {
                    "id": intent_id,
                    "metadata": { RESERVATION_ID_KEY: reservation_id }
                }
            }
        })
        .to_string()
        .into_bytes();

        let header = sign(&body, secret, chrono::Utc::now().timestamp())?;
        Ok((body, header))
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_intent(&self, req: &IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let behaviour = self.behaviour.lock().clone();
        match behaviour {
            MockBehaviour::Succeed => {}
            MockBehaviour::Fail => {
                return Err(GatewayError::Unavailable("mock gateway set to fail".into()));
            }
            MockBehaviour::Delay(d) => tokio::time::sleep(d).await,
        }

        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let intent = PaymentIntent {
            intent_id: format!("pi_mock_{n}"),
            client_secret: format!("pi_mock_{n}_secret_{}", Uuid::new_v4().simple()),
        };

        tracing::info!(
            intent_id = %intent.intent_id,
            amount = req.amount,
            reservation_id = %req.metadata.reservation_id,
            "mock payment intent created"
        );

        self.created.lock().push((intent.clone(), req.clone()));
        Ok(intent)
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<(), GatewayError> {
        if matches!(*self.behaviour.lock(), MockBehaviour::Fail) {
            return Err(GatewayError::Unavailable("mock gateway set to fail".into()));
        }
        self.cancelled.lock().push(intent_id.to_string());
        Ok(())
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<GatewayEvent, WebhookError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(WebhookError::MissingSecret)?;

        verify_signature(
            payload,
            signature,
            secret,
            chrono::Utc::now().timestamp(),
            DEFAULT_TOLERANCE_SECS,
        )?;

        decode_event(payload)
    }
}
