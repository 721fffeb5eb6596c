use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use super::auth::CurrentUser;
use super::types::{MessageResponse, PaymentCreateRequest, PaymentCreateResponse};
use super::{ApiError, ApiResponse, AppState, validation};
use crate::clients::razorpay::WebhookEnvelope;
use crate::services::PaymentContact;

const SIGNATURE_HEADER: &str = "x-razorpay-signature";
const EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// POST /payment/create
/// Registers a gateway order for a pending rental order and stores the
/// delivery contact on it
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<PaymentCreateRequest>,
) -> Result<Json<ApiResponse<PaymentCreateResponse>>, ApiError> {
    let name = validation::validate_name(&payload.name, "Contact name")?;
    let email = validation::validate_email(&payload.email)?;
    let phone = validation::validate_phone(&payload.phone)?;
    let address = payload.address.trim().to_string();
    if address.is_empty() {
        return Err(ApiError::validation("Delivery address cannot be empty"));
    }

    let order = super::orders::load_order_scoped(&state, &user, payload.order_id).await?;

    let intent = state
        .lifecycle_service()
        .initiate_payment(
            order.id,
            PaymentContact {
                name: name.to_string(),
                email,
                phone,
                address,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(PaymentCreateResponse {
        payment_order_id: intent.payment_order_id,
        amount_minor: intent.amount_minor,
        currency: intent.currency,
        rental_total: intent.rental_total,
        deposit_total: intent.deposit_total,
        key_id: state.config().razorpay.key_id.clone(),
    })))
}

/// POST /payment/webhook
/// Gateway capture notifications. Authenticity comes from the HMAC
/// signature over the raw body, so the handler consumes `Bytes` and
/// parses only after the check passes.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let secret_configured = !state.config().razorpay.webhook_secret.is_empty();
    if secret_configured {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing webhook signature".to_string()))?;
        if !state.razorpay().verify_webhook_signature(&body, signature) {
            return Err(ApiError::Unauthorized("Invalid webhook signature".to_string()));
        }
    } else {
        warn!("Accepting webhook without signature check; no webhook secret configured");
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|err| ApiError::validation(format!("Malformed webhook body: {err}")))?;

    // Delivery ids dedup replays before any order state is touched.
    let event_id = headers
        .get(EVENT_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Some(event_id) = event_id
        && !state.store().record_webhook_event(event_id, &envelope.event).await?
    {
        return Ok(Json(ApiResponse::success(MessageResponse {
            message: "Event already processed".to_string(),
        }))
        .into_response());
    }

    if envelope.event != "payment.captured" {
        return Ok(Json(ApiResponse::success(MessageResponse {
            message: format!("Event {} ignored", envelope.event),
        }))
        .into_response());
    }

    let payment_order_id = envelope
        .payload
        .and_then(|payload| payload.payment)
        .and_then(|payment| payment.entity.order_id);
    let Some(payment_order_id) = payment_order_id else {
        // A retry would carry the same body, so there is nothing to gain
        // from a non-2xx here.
        warn!("Capture event without a gateway order id; acknowledging without action");
        return Ok(Json(ApiResponse::success(MessageResponse {
            message: "Event carried no order reference".to_string(),
        }))
        .into_response());
    };

    match state
        .lifecycle_service()
        .apply_payment_captured(&payment_order_id)
        .await
    {
        Ok(report) => Ok(Json(ApiResponse::success(report)).into_response()),
        Err(err) => {
            // The gateway retries a failed delivery under the same id;
            // release it so the retry gets processed.
            if let Some(event_id) = event_id
                && let Err(release_err) = state.store().forget_webhook_event(event_id).await
            {
                warn!("Could not release webhook delivery {event_id}: {release_err}");
            }
            Err(err.into())
        }
    }
}
