use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub razorpay: RazorpayGatewayConfig,

    pub shiprocket: ShiprocketCarrierConfig,

    pub google: GoogleLoginConfig,

    pub mail: MailConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,

    /// Timeout applied to all outbound HTTP calls in seconds (default: 30)
    pub request_timeout_seconds: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/vastra.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RazorpayGatewayConfig {
    pub base_url: String,

    pub key_id: String,

    pub key_secret: String,

    /// Shared secret for webhook signature verification. When empty,
    /// webhook signatures are not enforced (development only).
    pub webhook_secret: String,
}

impl Default for RazorpayGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.razorpay.com".to_string(),
            key_id: String::new(),
            key_secret: String::new(),
            webhook_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiprocketCarrierConfig {
    pub base_url: String,

    pub email: String,

    pub password: String,

    /// Pickup location name as registered with the carrier.
    pub pickup_location: String,
}

impl Default for ShiprocketCarrierConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apiv2.shiprocket.in/v1/external".to_string(),
            email: String::new(),
            password: String::new(),
            pickup_location: "warehouse".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleLoginConfig {
    pub tokeninfo_url: String,

    /// OAuth client id the id token audience must match.
    pub client_id: String,
}

impl Default for GoogleLoginConfig {
    fn default() -> Self {
        Self {
            tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            client_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Transactional mail API endpoint. When empty, outgoing mail is
    /// written to the log instead of delivered.
    pub endpoint: String,

    pub api_key: String,

    pub from_address: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            from_address: "no-reply@vastra.example".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub metrics_port: Option<u16>,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "vastra".to_string());

        Self {
            metrics_enabled: true,
            metrics_port: None,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            razorpay: RazorpayGatewayConfig::default(),
            shiprocket: ShiprocketCarrierConfig::default(),
            google: GoogleLoginConfig::default(),
            mail: MailConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Secrets never live in the config file on disk; the environment
    /// (usually a .env file) wins over whatever the file carries.
    pub fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 8] = [
            ("DATABASE_URL", &mut self.general.database_path),
            ("RAZORPAY_KEY_ID", &mut self.razorpay.key_id),
            ("RAZORPAY_KEY_SECRET", &mut self.razorpay.key_secret),
            ("RAZORPAY_WEBHOOK_SECRET", &mut self.razorpay.webhook_secret),
            ("SHIPROCKET_EMAIL", &mut self.shiprocket.email),
            ("SHIPROCKET_PASSWORD", &mut self.shiprocket.password),
            ("GOOGLE_CLIENT_ID", &mut self.google.client_id),
            ("MAIL_API_KEY", &mut self.mail.api_key),
        ];

        for (key, slot) in overrides {
            if let Ok(value) = std::env::var(key)
                && !value.is_empty()
            {
                *slot = value;
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("vastra").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".vastra").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.general.max_db_connections == 0
            || self.general.min_db_connections > self.general.max_db_connections
        {
            anyhow::bail!("Database pool bounds are inconsistent");
        }

        if self.razorpay.key_id.is_empty() != self.razorpay.key_secret.is_empty() {
            anyhow::bail!("Razorpay key id and secret must be configured together");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.general.database_path, "sqlite:data/vastra.db");
        assert_eq!(config.shiprocket.pickup_location, "warehouse");
        assert!(config.razorpay.base_url.starts_with("https://"));
        config.validate().unwrap();
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[razorpay]"));
        assert!(toml_str.contains("[shiprocket]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [server]
            port = 9000

            [shiprocket]
            pickup_location = "warehouse-two"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.shiprocket.pickup_location, "warehouse-two");

        assert_eq!(config.razorpay.base_url, "https://api.razorpay.com");
    }

    #[test]
    fn test_validate_rejects_half_configured_gateway() {
        let mut config = Config::default();
        config.razorpay.key_id = "rzp_test_key".to_string();
        assert!(config.validate().is_err());
    }
}
