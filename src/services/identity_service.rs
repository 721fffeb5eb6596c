//! Domain service for passwordless identity.
//!
//! Two entry paths produce the same outcome: an emailed one-time
//! passcode, or a Google-verified id token. Either resolves to a local
//! user row and a bearer token pair. Tokens are opaque random values
//! stored server-side, so revocation is a row delete and validation is a
//! lookup.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid or unknown OTP code")]
    InvalidOtp,

    #[error("OTP code has expired")]
    OtpExpired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Mail delivery failed: {0}")]
    MailDelivery(String),

    #[error("Identity provider error: {0}")]
    External(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for IdentityError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for IdentityError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Bearer tokens handed to a freshly verified user.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Resolved caller identity attached to authenticated requests.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub email: String,
    pub is_admin: bool,
}

#[async_trait::async_trait]
pub trait IdentityService: Send + Sync {
    /// Issues a six-digit code to the address and mails it. The code is
    /// valid for ten minutes from issuance.
    async fn send_otp(&self, email: &str) -> Result<(), IdentityError>;

    /// Exchanges a still-valid emailed code for a token pair, creating
    /// the user on first contact.
    async fn verify_otp(&self, email: &str, code: &str) -> Result<TokenPair, IdentityError>;

    /// Exchanges a Google id token for a token pair, creating the user on
    /// first contact.
    async fn google_login(&self, id_token: &str) -> Result<TokenPair, IdentityError>;

    /// Exchanges a valid refresh token for a fresh access token. The
    /// refresh token itself is not rotated and stays usable until it
    /// expires.
    async fn refresh(&self, refresh_token: &str) -> Result<String, IdentityError>;

    /// Resolves an access token to its user. `None` means the token is
    /// unknown or expired, which the boundary turns into an
    /// unauthenticated response.
    async fn authenticate(&self, access_token: &str)
    -> Result<Option<AuthenticatedUser>, IdentityError>;
}
