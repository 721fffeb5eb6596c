use anyhow::{Context, Result, bail};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    /// Secret configured on the gateway dashboard for webhook signing.
    pub webhook_secret: String,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.razorpay.com".to_string(),
            key_id: String::new(),
            key_secret: String::new(),
            webhook_secret: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    /// Minor units (paise).
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Gateway-side order, echoed back to the frontend so it can open the
/// checkout widget.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

// Wire shapes of the capture webhook. Fields the handler does not read are
// left out; unknown events deserialize with payment = None.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: Option<WebhookPayload>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<WebhookPayment>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayment {
    pub entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    /// Gateway order id the payment settles; matches `payment_order_id`
    /// stored on our order row.
    pub order_id: Option<String>,
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: RazorpayConfig,
}

impl RazorpayClient {
    #[must_use]
    pub const fn new(config: RazorpayConfig, client: Client) -> Self {
        Self { client, config }
    }

    /// Creates a gateway order for the given amount in minor units. The
    /// returned id is stored on our order and matched against capture
    /// webhooks later.
    pub async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder> {
        let url = format!("{}/v1/orders", self.config.base_url);
        let body = CreateOrderRequest {
            amount: amount_minor,
            currency,
            receipt,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .context("Failed to reach payment gateway")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Payment gateway error: {status} - {body}");
        }

        let order: GatewayOrder = response
            .json()
            .await
            .context("Failed to parse gateway order response")?;
        debug!("Created gateway order {} for {} {}", order.id, amount_minor, currency);
        Ok(order)
    }

    /// Verifies the `x-razorpay-signature` header against the raw request
    /// body: HMAC-SHA256 over the exact bytes, hex encoded. The comparison
    /// runs in constant time via the MAC itself, so the check never leaks
    /// how many prefix bytes matched.
    #[must_use]
    pub fn verify_webhook_signature(&self, body: &[u8], signature_hex: &str) -> bool {
        let Some(signature) = decode_hex(signature_hex) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.config.webhook_secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&signature).is_ok()
    }
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || s.is_empty() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_secret(secret: &str) -> RazorpayClient {
        RazorpayClient::new(
            RazorpayConfig {
                webhook_secret: secret.to_string(),
                ..Default::default()
            },
            Client::new(),
        )
    }

    #[test]
    fn accepts_known_hmac_vector() {
        // RFC 4231 test case 2.
        let client = client_with_secret("Jefe");
        let body = b"what do ya want for nothing?";
        let signature = "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843";
        assert!(client.verify_webhook_signature(body, signature));
    }

    #[test]
    fn rejects_tampered_body() {
        let client = client_with_secret("Jefe");
        let signature = "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843";
        assert!(!client.verify_webhook_signature(b"what do ya want for something?", signature));
    }

    #[test]
    fn rejects_malformed_signature() {
        let client = client_with_secret("Jefe");
        assert!(!client.verify_webhook_signature(b"body", "not-hex"));
        assert!(!client.verify_webhook_signature(b"body", "abc"));
        assert!(!client.verify_webhook_signature(b"body", ""));
    }

    #[test]
    fn capture_envelope_parses() {
        let raw = r#"{
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": {"id": "pay_123", "order_id": "order_456", "amount": 60000}
                }
            }
        }"#;
        let envelope: WebhookEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.event, "payment.captured");
        let entity = envelope.payload.unwrap().payment.unwrap().entity;
        assert_eq!(entity.order_id.as_deref(), Some("order_456"));
    }

    #[test]
    fn unrelated_event_parses_without_payment() {
        let raw = r#"{"event": "refund.processed", "payload": {}}"#;
        let envelope: WebhookEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.event, "refund.processed");
        assert!(envelope.payload.unwrap().payment.is_none());
    }
}
