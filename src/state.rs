use std::sync::Arc;

use crate::clients::google::{GoogleAuthClient, GoogleAuthConfig};
use crate::clients::mailer::{HttpMailer, LogMailer, Mailer, MailerConfig};
use crate::clients::razorpay::{RazorpayClient, RazorpayConfig};
use crate::clients::shiprocket::{ShiprocketClient, ShiprocketConfig};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    BookingService, IdentityService, LifecycleService, SeaOrmBookingService,
    SeaOrmIdentityService, SeaOrmLifecycleService,
};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// This client should be reused across all HTTP-based clients to enable
/// connection pooling and avoid socket exhaustion.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Vastra/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    /// Kept alongside the lifecycle service for webhook signature checks,
    /// which happen at the boundary before any service call.
    pub razorpay: Arc<RazorpayClient>,

    pub booking_service: Arc<dyn BookingService>,

    pub lifecycle_service: Arc<dyn LifecycleService>,

    pub identity_service: Arc<dyn IdentityService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client =
            build_shared_http_client(config.general.request_timeout_seconds.into())?;

        let razorpay = Arc::new(RazorpayClient::new(
            RazorpayConfig {
                base_url: config.razorpay.base_url.clone(),
                key_id: config.razorpay.key_id.clone(),
                key_secret: config.razorpay.key_secret.clone(),
                webhook_secret: config.razorpay.webhook_secret.clone(),
            },
            http_client.clone(),
        ));

        let shiprocket = Arc::new(ShiprocketClient::new(
            ShiprocketConfig {
                base_url: config.shiprocket.base_url.clone(),
                email: config.shiprocket.email.clone(),
                password: config.shiprocket.password.clone(),
                pickup_location: config.shiprocket.pickup_location.clone(),
            },
            http_client.clone(),
        ));

        let google = Arc::new(GoogleAuthClient::new(
            GoogleAuthConfig {
                tokeninfo_url: config.google.tokeninfo_url.clone(),
                client_id: config.google.client_id.clone(),
            },
            http_client.clone(),
        ));

        let mailer: Arc<dyn Mailer> = if config.mail.endpoint.is_empty() {
            Arc::new(LogMailer)
        } else {
            Arc::new(HttpMailer::new(
                MailerConfig {
                    endpoint: config.mail.endpoint.clone(),
                    api_key: config.mail.api_key.clone(),
                    from_address: config.mail.from_address.clone(),
                },
                http_client,
            ))
        };

        let booking_service =
            Arc::new(SeaOrmBookingService::new(store.clone())) as Arc<dyn BookingService>;

        let lifecycle_service = Arc::new(SeaOrmLifecycleService::new(
            store.clone(),
            booking_service.clone(),
            razorpay.clone(),
            shiprocket,
        )) as Arc<dyn LifecycleService>;

        let identity_service = Arc::new(SeaOrmIdentityService::new(store.clone(), google, mailer))
            as Arc<dyn IdentityService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            razorpay,
            booking_service,
            lifecycle_service,
            identity_service,
        })
    }
}
