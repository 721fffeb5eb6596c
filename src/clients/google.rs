use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GoogleAuthConfig {
    pub tokeninfo_url: String,
    /// OAuth client id the id tokens must be minted for.
    pub client_id: String,
}

impl Default for GoogleAuthConfig {
    fn default() -> Self {
        Self {
            tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            client_id: String::new(),
        }
    }
}

// tokeninfo represents booleans as strings ("true"/"false").
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
    email_verified: Option<String>,
}

/// Identity extracted from a verified Google id token.
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    pub email: String,
}

#[derive(Clone)]
pub struct GoogleAuthClient {
    client: Client,
    config: GoogleAuthConfig,
}

impl GoogleAuthClient {
    #[must_use]
    pub const fn new(config: GoogleAuthConfig, client: Client) -> Self {
        Self { client, config }
    }

    /// Validates an id token against the tokeninfo endpoint. `None` means
    /// the token is not acceptable (expired, wrong audience, unverified
    /// email); errors are reserved for the endpoint being unreachable.
    pub async fn verify(&self, id_token: &str) -> Result<Option<GoogleIdentity>> {
        let response = self
            .client
            .get(&self.config.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .context("Failed to reach token verification endpoint")?;

        let status = response.status();
        if status.is_client_error() {
            debug!("Token verification rejected the id token ({status})");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Token verification endpoint error: {status} - {body}");
        }

        let info: TokenInfo = response
            .json()
            .await
            .context("Failed to parse tokeninfo response")?;

        if info.aud != self.config.client_id {
            debug!("Id token audience mismatch");
            return Ok(None);
        }
        if info.email_verified.as_deref() != Some("true") {
            debug!("Id token email not verified");
            return Ok(None);
        }
        let Some(email) = info.email else {
            debug!("Id token carried no email claim");
            return Ok(None);
        };

        Ok(Some(GoogleIdentity { email }))
    }
}
