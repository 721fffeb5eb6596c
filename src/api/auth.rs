use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;

use super::types::{
    AccessTokenResponse, GoogleLoginRequest, MessageResponse, RefreshRequest, SendOtpRequest,
    VerifyOtpRequest,
};
use super::{ApiError, ApiResponse, AppState, validation};
use crate::services::{AuthenticatedUser, TokenPair};

/// Caller identity injected into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

impl CurrentUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.is_admin {
            Ok(())
        } else {
            Err(ApiError::admin_only())
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves `Authorization: Bearer <token>` against the token store and
/// injects [`CurrentUser`]; anything else is turned away before reaching
/// a handler.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_bearer_token(&headers)
        && let Ok(Some(user)) = state.identity_service().authenticate(&token).await
    {
        tracing::Span::current().record("user_id", user.id);
        request.extensions_mut().insert(CurrentUser(user));
        return Ok(next.run(request).await);
    }

    let response = (StatusCode::UNAUTHORIZED, "Unauthorized");
    Ok(response.into_response())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/send-otp
/// Issue a login code to the given address
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validation::validate_email(&payload.email)?;

    state.identity_service().send_otp(&email).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("OTP sent to {email}"),
    })))
}

/// POST /auth/verify-otp
/// Exchange a valid code for a token pair
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    let email = validation::validate_email(&payload.email)?;
    if payload.otp.trim().is_empty() {
        return Err(ApiError::validation("OTP code is required"));
    }

    let pair = state.identity_service().verify_otp(&email, &payload.otp).await?;

    Ok(Json(ApiResponse::success(pair)))
}

/// POST /auth/google-login
/// Exchange a Google id token for a token pair
pub async fn google_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    if payload.token.trim().is_empty() {
        return Err(ApiError::validation("Token is required"));
    }

    let pair = state.identity_service().google_login(&payload.token).await?;

    Ok(Json(ApiResponse::success(pair)))
}

/// POST /auth/refresh
/// Exchange a refresh token for a fresh access token
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AccessTokenResponse>>, ApiError> {
    if payload.refresh.trim().is_empty() {
        return Err(ApiError::validation("Refresh token is required"));
    }

    let access_token = state.identity_service().refresh(&payload.refresh).await?;

    Ok(Json(ApiResponse::success(AccessTokenResponse {
        access_token,
    })))
}
