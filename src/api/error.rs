use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{BookingError, IdentityError, LifecycleError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ExternalApiError { service: String, message: String },

    ValidationError(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ExternalApiError { service, message } => {
                write!(f, "{} error: {}", service, message)
            }
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ExternalApiError { service, message } => {
                tracing::warn!("{} API error: {}", service, message);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("{} service is unavailable", service),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::EmptyOrder
            | BookingError::InvalidQuantity { .. }
            | BookingError::InvalidSize { .. }
            | BookingError::InvalidDateRange => ApiError::ValidationError(err.to_string()),
            BookingError::ItemNotFound { item_id } => ApiError::item_not_found(item_id),
            BookingError::ItemUnavailable { .. } => ApiError::Conflict(err.to_string()),
            BookingError::OrderNotFound => ApiError::NotFound("Order not found".to_string()),
            BookingError::Database(msg) => ApiError::DatabaseError(msg),
            BookingError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::OrderNotFound => ApiError::NotFound("Order not found".to_string()),
            LifecycleError::NotPending
            | LifecycleError::NotActive
            | LifecycleError::ShipmentNotReady
            | LifecycleError::MissingContact => ApiError::Conflict(err.to_string()),
            LifecycleError::Gateway(msg) => ApiError::razorpay_error(msg),
            LifecycleError::Shipping(msg) => ApiError::shiprocket_error(msg),
            LifecycleError::Database(msg) => ApiError::DatabaseError(msg),
            LifecycleError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidEmail | IdentityError::InvalidOtp | IdentityError::OtpExpired => {
                ApiError::ValidationError(err.to_string())
            }
            IdentityError::InvalidToken => ApiError::Unauthorized(err.to_string()),
            IdentityError::MailDelivery(msg) => ApiError::ExternalApiError {
                service: "Mail".to_string(),
                message: msg,
            },
            IdentityError::External(msg) => ApiError::ExternalApiError {
                service: "Google".to_string(),
                message: msg,
            },
            IdentityError::Database(msg) => ApiError::DatabaseError(msg),
            IdentityError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn item_not_found(id: i32) -> Self {
        ApiError::NotFound(format!("Item {} not found", id))
    }

    pub fn order_not_found(id: i32) -> Self {
        ApiError::NotFound(format!("Order {} not found", id))
    }

    pub fn category_not_found(id: i32) -> Self {
        ApiError::NotFound(format!("Category {} not found", id))
    }

    pub fn razorpay_error(msg: impl Into<String>) -> Self {
        ApiError::ExternalApiError {
            service: "Razorpay".to_string(),
            message: msg.into(),
        }
    }

    pub fn shiprocket_error(msg: impl Into<String>) -> Self {
        ApiError::ExternalApiError {
            service: "Shiprocket".to_string(),
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }

    pub fn admin_only() -> Self {
        ApiError::Forbidden("Administrator access required".to_string())
    }
}
