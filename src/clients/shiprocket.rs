use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ShiprocketConfig {
    /// Includes the API prefix, e.g. `https://apiv2.shiprocket.in/v1/external`.
    pub base_url: String,
    pub email: String,
    pub password: String,
    /// Pickup location nickname registered on the provider dashboard.
    pub pickup_location: String,
}

impl Default for ShiprocketConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apiv2.shiprocket.in/v1/external".to_string(),
            email: String::new(),
            password: String::new(),
            pickup_location: "warehouse".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// One parcel line in a shipment order. `selling_price` travels as text,
/// matching what the provider accepts for decimal amounts.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentLineItem {
    pub name: String,
    pub sku: String,
    pub units: i32,
    pub selling_price: String,
}

/// Forward shipment order payload (`orders/create/adhoc`).
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentOrderRequest {
    pub order_id: String,
    pub order_date: String,
    pub pickup_location: String,
    pub billing_customer_name: String,
    pub billing_last_name: String,
    pub billing_address: String,
    pub billing_city: String,
    pub billing_pincode: String,
    pub billing_state: String,
    pub billing_country: String,
    pub billing_email: String,
    pub billing_phone: String,
    pub shipping_is_billing: bool,
    pub order_items: Vec<ShipmentLineItem>,
    pub payment_method: String,
    pub sub_total: String,
    pub length: f64,
    pub breadth: f64,
    pub height: f64,
    pub weight: f64,
}

/// Return pickup payload (`orders/create/return`): the parcel travels from
/// the customer back to the warehouse, so the customer is the pickup side.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnOrderRequest {
    pub order_id: String,
    pub order_date: String,
    pub pickup_customer_name: String,
    pub pickup_last_name: String,
    pub pickup_address: String,
    pub pickup_city: String,
    pub pickup_pincode: String,
    pub pickup_state: String,
    pub pickup_country: String,
    pub pickup_email: String,
    pub pickup_phone: String,
    pub order_items: Vec<ShipmentLineItem>,
    pub payment_method: String,
    pub sub_total: String,
    pub length: f64,
    pub breadth: f64,
    pub height: f64,
    pub weight: f64,
}

/// Ids assigned by the provider when an order is created.
#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentCreated {
    pub order_id: i64,
    pub shipment_id: i64,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    tracking_data: TrackingData,
}

#[derive(Debug, Deserialize)]
struct TrackingData {
    #[serde(default)]
    shipment_status: Option<i64>,
    #[serde(default)]
    etd: Option<String>,
}

/// Provider-side view of one shipment: the numeric status code plus the
/// estimated delivery timestamp as the provider formats it.
#[derive(Debug, Clone)]
pub struct TrackingSnapshot {
    pub status_code: Option<i64>,
    pub etd: Option<String>,
}

pub struct ShiprocketClient {
    client: Client,
    config: ShiprocketConfig,
    /// Bearer token from the login endpoint, refreshed when a call comes
    /// back 401.
    token: RwLock<Option<String>>,
}

impl ShiprocketClient {
    #[must_use]
    pub fn new(config: ShiprocketConfig, client: Client) -> Self {
        Self {
            client,
            config,
            token: RwLock::new(None),
        }
    }

    async fn login(&self) -> Result<String> {
        let url = format!("{}/auth/login", self.config.base_url);
        let body = LoginRequest {
            email: self.config.email.trim(),
            password: &self.config.password,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to reach shipping provider for login")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Shipping provider login failed: {status} - {body}");
        }

        let parsed: LoginResponse = response
            .json()
            .await
            .context("Failed to parse shipping provider login response")?;

        debug!("Authenticated with shipping provider");
        *self.token.write().await = Some(parsed.token.clone());
        Ok(parsed.token)
    }

    async fn token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        self.login().await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{path}", self.config.base_url);
        let token = self.token().await?;

        let mut response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .context("Failed to reach shipping provider")?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(reason = "token_expired", "Re-authenticating with shipping provider");
            let token = self.login().await?;
            response = self
                .client
                .post(&url)
                .bearer_auth(&token)
                .json(body)
                .send()
                .await
                .context("Failed to reach shipping provider after re-login")?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Shipping provider error: {status} - {body}");
        }

        response
            .json()
            .await
            .context("Failed to parse shipping provider response")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.config.base_url);
        let token = self.token().await?;

        let mut response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .context("Failed to reach shipping provider")?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(reason = "token_expired", "Re-authenticating with shipping provider");
            let token = self.login().await?;
            response = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .send()
                .await
                .context("Failed to reach shipping provider after re-login")?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Shipping provider error: {status} - {body}");
        }

        response
            .json()
            .await
            .context("Failed to parse shipping provider response")
    }

    pub async fn create_order(&self, request: &ShipmentOrderRequest) -> Result<ShipmentCreated> {
        self.post_json("/orders/create/adhoc", request).await
    }

    pub async fn create_return(&self, request: &ReturnOrderRequest) -> Result<ShipmentCreated> {
        self.post_json("/orders/create/return", request).await
    }

    pub async fn track(&self, shipment_id: &str) -> Result<TrackingSnapshot> {
        let response: TrackResponse = self
            .get_json(&format!("/courier/track/shipment/{shipment_id}"))
            .await?;

        Ok(TrackingSnapshot {
            status_code: response.tracking_data.shipment_status,
            etd: response.tracking_data.etd,
        })
    }

    #[must_use]
    pub fn pickup_location(&self) -> &str {
        &self.config.pickup_location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_response_parses_with_etd() {
        let raw = r#"{
            "tracking_data": {
                "track_status": 1,
                "shipment_status": 7,
                "etd": "2025-02-10 18:00:00"
            }
        }"#;
        let parsed: TrackResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.tracking_data.shipment_status, Some(7));
        assert_eq!(parsed.tracking_data.etd.as_deref(), Some("2025-02-10 18:00:00"));
    }

    #[test]
    fn tracking_response_tolerates_missing_fields() {
        let raw = r#"{"tracking_data": {"track_status": 0}}"#;
        let parsed: TrackResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.tracking_data.shipment_status, None);
        assert_eq!(parsed.tracking_data.etd, None);
    }

    #[test]
    fn shipment_order_serializes_provider_field_names() {
        let request = ShipmentOrderRequest {
            order_id: "41".to_string(),
            order_date: "2025-02-01".to_string(),
            pickup_location: "warehouse".to_string(),
            billing_customer_name: "Asha".to_string(),
            billing_last_name: String::new(),
            billing_address: "12 MG Road".to_string(),
            billing_city: "Pune".to_string(),
            billing_pincode: "411042".to_string(),
            billing_state: "Maharashtra".to_string(),
            billing_country: "India".to_string(),
            billing_email: "asha@example.com".to_string(),
            billing_phone: "9999999999".to_string(),
            shipping_is_billing: true,
            order_items: vec![ShipmentLineItem {
                name: "Silk Saree".to_string(),
                sku: "7".to_string(),
                units: 2,
                selling_price: "100.00".to_string(),
            }],
            payment_method: "Prepaid".to_string(),
            sub_total: "600.00".to_string(),
            length: 10.0,
            breadth: 10.0,
            height: 1.0,
            weight: 0.5,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["pickup_location"], "warehouse");
        assert_eq!(json["billing_city"], "Pune");
        assert_eq!(json["shipping_is_billing"], true);
        assert_eq!(json["order_items"][0]["sku"], "7");
        assert_eq!(json["payment_method"], "Prepaid");
    }
}
