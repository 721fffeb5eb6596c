use chrono::{Duration, Utc};
use rand::Rng;
use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::clients::google::GoogleAuthClient;
use crate::clients::mailer::Mailer;
use crate::db::Store;
use crate::entities::auth_tokens::TokenKind;
use crate::entities::users::AuthProvider;
use crate::services::identity_service::{
    AuthenticatedUser, IdentityError, IdentityService, TokenPair,
};

const OTP_TTL_MINUTES: i64 = 10;
const ACCESS_TTL_MINUTES: i64 = 60;
const REFRESH_TTL_DAYS: i64 = 7;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"))
}

/// SeaORM-backed implementation of passwordless identity.
pub struct SeaOrmIdentityService {
    store: Store,
    google: Arc<GoogleAuthClient>,
    mailer: Arc<dyn Mailer>,
}

impl SeaOrmIdentityService {
    #[must_use]
    pub const fn new(store: Store, google: Arc<GoogleAuthClient>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            google,
            mailer,
        }
    }

    async fn issue_pair(&self, user_id: i32) -> Result<TokenPair, IdentityError> {
        // Housekeeping on the hot path is fine at this scale; a failure
        // only delays cleanup.
        if let Err(e) = self.store.prune_expired_tokens().await {
            warn!("Expired-token prune skipped: {}", e);
        }

        let access = self
            .store
            .issue_token(user_id, TokenKind::Access, Duration::minutes(ACCESS_TTL_MINUTES))
            .await?;
        let refresh = self
            .store
            .issue_token(user_id, TokenKind::Refresh, Duration::days(REFRESH_TTL_DAYS))
            .await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }
}

#[async_trait::async_trait]
impl IdentityService for SeaOrmIdentityService {
    async fn send_otp(&self, email: &str) -> Result<(), IdentityError> {
        let email = email.trim().to_lowercase();
        if !email_re().is_match(&email) {
            return Err(IdentityError::InvalidEmail);
        }

        let code = format!("{:06}", rand::rng().random_range(0..=999_999));
        self.store.create_otp(&email, &code).await?;

        let body = format!(
            "Your OTP code is {code}. It expires in {OTP_TTL_MINUTES} minutes."
        );
        self.mailer
            .send(&email, "Your login OTP", &body)
            .await
            .map_err(|e| IdentityError::MailDelivery(e.to_string()))?;

        info!("OTP issued to {}", email);
        Ok(())
    }

    async fn verify_otp(&self, email: &str, code: &str) -> Result<TokenPair, IdentityError> {
        let email = email.trim().to_lowercase();
        let code = code.trim();

        let request = self
            .store
            .latest_otp_matching(&email, code)
            .await?
            .ok_or(IdentityError::InvalidOtp)?;

        let expires_at = request.created_at + Duration::minutes(OTP_TTL_MINUTES);
        if Utc::now() > expires_at {
            return Err(IdentityError::OtpExpired);
        }

        let (user, created) = self
            .store
            .get_or_create_user(&email, AuthProvider::Otp)
            .await?;
        if created {
            info!("User {} created via OTP login", user.id);
        }

        self.issue_pair(user.id).await
    }

    async fn google_login(&self, id_token: &str) -> Result<TokenPair, IdentityError> {
        let identity = self
            .google
            .verify(id_token)
            .await
            .map_err(|e| IdentityError::External(e.to_string()))?
            .ok_or(IdentityError::InvalidToken)?;

        let (user, created) = self
            .store
            .get_or_create_user(&identity.email, AuthProvider::Google)
            .await?;
        if created {
            info!("User {} created via Google login", user.id);
        }

        self.issue_pair(user.id).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, IdentityError> {
        let (_, user) = self
            .store
            .find_valid_token(refresh_token, TokenKind::Refresh)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        let access = self
            .store
            .issue_token(user.id, TokenKind::Access, Duration::minutes(ACCESS_TTL_MINUTES))
            .await?;
        Ok(access.token)
    }

    async fn authenticate(
        &self,
        access_token: &str,
    ) -> Result<Option<AuthenticatedUser>, IdentityError> {
        let found = self
            .store
            .find_valid_token(access_token, TokenKind::Access)
            .await?;

        Ok(found.map(|(_, user)| AuthenticatedUser {
            id: user.id,
            email: user.email,
            is_admin: user.is_admin,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::google::GoogleAuthConfig;
    use crate::entities::{otp_requests, prelude::OtpRequests};
    use sea_orm::{
        ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct CaptureMailer {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait::async_trait]
    impl Mailer for CaptureMailer {
        async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), text.to_string()));
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait::async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _text: &str) -> anyhow::Result<()> {
            anyhow::bail!("smtp down")
        }
    }

    fn service_with(store: Store, mailer: Arc<dyn Mailer>) -> SeaOrmIdentityService {
        let google = Arc::new(GoogleAuthClient::new(
            GoogleAuthConfig {
                tokeninfo_url: "http://127.0.0.1:9".to_string(),
                ..GoogleAuthConfig::default()
            },
            reqwest::Client::new(),
        ));
        SeaOrmIdentityService::new(store, google, mailer)
    }

    async fn latest_code(store: &Store, email: &str) -> String {
        OtpRequests::find()
            .filter(otp_requests::Column::Email.eq(email))
            .order_by_desc(otp_requests::Column::CreatedAt)
            .one(&store.conn)
            .await
            .unwrap()
            .unwrap()
            .code
    }

    async fn backdate_latest_otp(store: &Store, email: &str, minutes: i64) {
        let row = OtpRequests::find()
            .filter(otp_requests::Column::Email.eq(email))
            .order_by_desc(otp_requests::Column::CreatedAt)
            .one(&store.conn)
            .await
            .unwrap()
            .unwrap();
        let mut active: otp_requests::ActiveModel = row.into();
        active.created_at = ActiveValue::Set(Utc::now() - Duration::minutes(minutes));
        active.update(&store.conn).await.unwrap();
    }

    #[tokio::test]
    async fn otp_mail_carries_code_and_expiry() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let mailer = Arc::new(CaptureMailer::default());
        let svc = service_with(store.clone(), mailer.clone());

        svc.send_otp("  Asha@Example.COM ").await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, subject, text) = &sent[0];
        assert_eq!(to, "asha@example.com");
        assert_eq!(subject, "Your login OTP");
        let code = latest_code(&store, "asha@example.com").await;
        assert_eq!(code.len(), 6);
        assert_eq!(
            text,
            &format!("Your OTP code is {code}. It expires in 10 minutes.")
        );
    }

    #[tokio::test]
    async fn rejects_malformed_email_before_any_write() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let svc = service_with(store.clone(), Arc::new(CaptureMailer::default()));

        for bad in ["", "not-an-email", "a@b", "two words@example.com"] {
            assert!(matches!(
                svc.send_otp(bad).await.unwrap_err(),
                IdentityError::InvalidEmail
            ));
        }
        assert!(
            OtpRequests::find()
                .all(&store.conn)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn mail_failure_is_reported() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let svc = service_with(store, Arc::new(FailingMailer));

        let err = svc.send_otp("asha@example.com").await.unwrap_err();
        assert!(matches!(err, IdentityError::MailDelivery(_)));
    }

    #[tokio::test]
    async fn fresh_code_verifies_and_reuse_within_expiry_is_allowed() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let svc = service_with(store.clone(), Arc::new(CaptureMailer::default()));

        svc.send_otp("asha@example.com").await.unwrap();
        let code = latest_code(&store, "asha@example.com").await;

        // Nine minutes in: still valid.
        backdate_latest_otp(&store, "asha@example.com", 9).await;
        let pair = svc.verify_otp("asha@example.com", &code).await.unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);

        // Codes are not consumed on use; a replay inside the window works.
        let again = svc.verify_otp("asha@example.com", &code).await.unwrap();
        assert_ne!(again.access_token, pair.access_token);
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let svc = service_with(store.clone(), Arc::new(CaptureMailer::default()));

        svc.send_otp("asha@example.com").await.unwrap();
        let code = latest_code(&store, "asha@example.com").await;
        backdate_latest_otp(&store, "asha@example.com", 11).await;

        let err = svc.verify_otp("asha@example.com", &code).await.unwrap_err();
        assert!(matches!(err, IdentityError::OtpExpired));
    }

    #[tokio::test]
    async fn wrong_code_is_rejected() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let svc = service_with(store.clone(), Arc::new(CaptureMailer::default()));

        svc.send_otp("asha@example.com").await.unwrap();
        let code = latest_code(&store, "asha@example.com").await;
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let err = svc.verify_otp("asha@example.com", wrong).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidOtp));
    }

    #[tokio::test]
    async fn access_token_authenticates_and_refresh_mints_new_access() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let svc = service_with(store.clone(), Arc::new(CaptureMailer::default()));

        svc.send_otp("asha@example.com").await.unwrap();
        let code = latest_code(&store, "asha@example.com").await;
        let pair = svc.verify_otp("asha@example.com", &code).await.unwrap();

        let user = svc
            .authenticate(&pair.access_token)
            .await
            .unwrap()
            .expect("access token should resolve");
        assert_eq!(user.email, "asha@example.com");
        assert!(!user.is_admin);

        let new_access = svc.refresh(&pair.refresh_token).await.unwrap();
        assert!(
            svc.authenticate(&new_access)
                .await
                .unwrap()
                .is_some()
        );

        // Tokens are kind-scoped; an access token cannot refresh.
        assert!(matches!(
            svc.refresh(&pair.access_token).await.unwrap_err(),
            IdentityError::InvalidToken
        ));
        // A refresh token is not an access credential.
        assert!(
            svc.authenticate(&pair.refresh_token)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn unknown_access_token_resolves_to_none() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let svc = service_with(store, Arc::new(CaptureMailer::default()));

        assert!(svc.authenticate("deadbeef").await.unwrap().is_none());
    }
}
