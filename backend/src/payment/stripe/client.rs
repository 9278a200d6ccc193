use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::payment::errors::{GatewayError, WebhookError};
use crate::payment::stripe::signature::{DEFAULT_TOLERANCE_SECS, verify_signature};
use crate::payment::stripe::types::{
    RESERVATION_ID_KEY, StripeErrorEnvelope, StripeIntent, decode_event,
};
use crate::payment::{GatewayEvent, IntentRequest, PaymentGateway, PaymentIntent};

#[derive(Clone)]
pub struct StripeGateway {
    http: Client,
    api_base: String,
    secret_key: String,
    webhook_secret: Option<String>,
}

impl StripeGateway {
    pub fn new(
        api_base: String,
        secret_key: String,
        webhook_secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            webhook_secret,
        })
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}{}", self.api_base, path);

        let mut req = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = match resp.json::<StripeErrorEnvelope>().await {
            Ok(env) => {
                let kind = env.error.kind.unwrap_or_default();
                let msg = env.error.message.unwrap_or_default();
                format!("{kind}: {msg}")
            }
            Err(_) => status.to_string(),
        };

        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(
        skip(self, req),
        target = "payment",
        fields(reservation_id = %req.metadata.reservation_id, amount = req.amount)
    )]
    async fn create_intent(&self, req: &IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let m = &req.metadata;
        let rid_key = format!("metadata[{RESERVATION_ID_KEY}]");
        let form = [
            ("amount", req.amount.to_string()),
            ("currency", req.currency.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            (rid_key.as_str(), m.reservation_id.to_string()),
            ("metadata[restaurantId]", m.restaurant_id.clone()),
            ("metadata[eventId]", m.event_id.clone()),
            ("metadata[slotId]", m.slot_id.clone()),
            ("metadata[userId]", m.user_id.clone()),
        ];

        // One intent per reservation, even if the request is retried.
        let idem = m.reservation_id.to_string();
        let resp = self
            .post_form("/v1/payment_intents", &form, Some(&idem))
            .await?;

        let intent: StripeIntent = resp
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| GatewayError::InvalidResponse("intent without client_secret".into()))?;

        debug!(intent_id = %intent.id, "payment intent created");

        Ok(PaymentIntent {
            intent_id: intent.id,
            client_secret,
        })
    }

    #[instrument(skip(self), target = "payment")]
    async fn cancel_intent(&self, intent_id: &str) -> Result<(), GatewayError> {
        let path = format!("/v1/payment_intents/{intent_id}/cancel");
        match self.post_form(&path, &[], None).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "payment intent cancel failed");
                Err(e)
            }
        }
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
