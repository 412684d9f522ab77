//! Configuration management for the hookline webhook receiver.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use axum::http::HeaderName;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    crypto::{SignatureVerifier, SigningSecret},
    middleware::CaptureConfig,
};

const CONFIG_FILE: &str = "hookline.toml";

const SECRETS_ENV: &str = "SIGNING_SECRETS";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`hookline.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// The defaults work out of the box except for `signing_secrets`, which has
/// no sensible default and must be provided.
///
/// # Example
///
/// ```no_run
/// use hookline_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Receiving webhooks on {}", config.webhook_path);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds. Bounds handler run time as seen by
    /// the sender; a timed-out handler keeps running to completion.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // Webhook route
    /// Route receiving signed webhook deliveries.
    ///
    /// Environment variable: `WEBHOOK_PATH`
    #[serde(default = "default_webhook_path", alias = "WEBHOOK_PATH")]
    pub webhook_path: String,
    /// Header carrying `t=<unix-seconds>,v1=<hex>` signatures.
    ///
    /// Environment variable: `SIGNATURE_HEADER`
    #[serde(default = "default_signature_header", alias = "SIGNATURE_HEADER")]
    pub signature_header: String,

    // Verification
    /// Signing secrets, current first. Keep the previous secret listed
    /// while senders rotate.
    ///
    /// Environment variable: `SIGNING_SECRETS` (comma separated)
    #[serde(default, alias = "SIGNING_SECRETS", deserialize_with = "comma_list")]
    pub signing_secrets: Vec<SigningSecret>,
    /// Maximum allowed skew between signing time and receipt, in seconds.
    ///
    /// Environment variable: `SIGNATURE_TOLERANCE_SECS`
    #[serde(default = "default_tolerance", alias = "SIGNATURE_TOLERANCE_SECS")]
    pub signature_tolerance_secs: u64,

    // Raw body capture
    /// Path patterns whose bodies are buffered; `/x/*` is a prefix pattern.
    ///
    /// Environment variable: `CAPTURE_PATHS` (comma separated)
    #[serde(default = "default_capture_paths", alias = "CAPTURE_PATHS", deserialize_with = "comma_list")]
    pub capture_paths: Vec<String>,
    /// Maximum captured body size in bytes.
    ///
    /// Environment variable: `MAX_BODY_BYTES`
    #[serde(default = "default_max_body_bytes", alias = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // Handlers
    /// Event types the stock binary acknowledges with a logging handler.
    ///
    /// Environment variable: `ACKNOWLEDGED_EVENT_TYPES` (comma separated)
    #[serde(default, alias = "ACKNOWLEDGED_EVENT_TYPES", deserialize_with = "comma_list")]
    pub acknowledged_event_types: Vec<String>,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("").ignore(&[SECRETS_ENV]));

        // Env values are type-sniffed; secrets must stay verbatim strings so
        // `123456` or `0042` survive intact.
        if let Ok(secrets) = std::env::var(SECRETS_ENV) {
            figment = figment.merge(Serialized::default("signing_secrets", secrets));
        }

        Self::from_figment(figment)
    }

    /// Extracts and validates configuration from an explicit provider stack.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the signature verifier.
    pub fn to_verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(
            self.signing_secrets.clone(),
            Duration::from_secs(self.signature_tolerance_secs),
        )
    }

    /// Builds the raw body capture rules.
    pub fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig::from_patterns(&self.capture_paths, self.max_body_bytes)
    }

    /// Transport-level request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Parsed signature header name.
    pub fn signature_header_name(&self) -> Result<HeaderName> {
        HeaderName::from_str(&self.signature_header).context("Invalid signature_header")
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.signing_secrets.is_empty() {
            anyhow::bail!("at least one signing secret is required");
        }

        if self.signing_secrets.iter().any(SigningSecret::is_empty) {
            anyhow::bail!("signing secrets must not be empty");
        }

        if self.signature_tolerance_secs == 0 {
            anyhow::bail!("signature_tolerance_secs must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        if let Some(pattern) = self.capture_paths.iter().find(|p| !p.starts_with('/')) {
            anyhow::bail!("capture path '{pattern}' must start with '/'");
        }

        if !self.webhook_path.starts_with('/') {
            anyhow::bail!("webhook_path must start with '/'");
        }

        if !self.to_capture_config().matches(&self.webhook_path) {
            anyhow::bail!(
                "webhook_path '{}' is not covered by capture_paths; signatures could never verify",
                self.webhook_path
            );
        }

        self.signature_header_name()?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            webhook_path: default_webhook_path(),
            signature_header: default_signature_header(),
            signing_secrets: Vec::new(),
            signature_tolerance_secs: default_tolerance(),
            capture_paths: default_capture_paths(),
            max_body_bytes: default_max_body_bytes(),
            acknowledged_event_types: Vec::new(),
            rust_log: default_log_level(),
        }
    }
}

/// Accepts a list, a comma-separated string, or a bare number.
fn comma_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + From<String>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(String),
        Number(serde_json::Number),
    }

    Ok(match OneOrMany::<T>::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::Number(number) => vec![T::from(number.to_string())],
        OneOrMany::One(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| T::from(item.to_string()))
            .collect(),
    })
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_webhook_path() -> String {
    "/webhooks/events".to_string()
}

fn default_signature_header() -> String {
    "webhook-signature".to_string()
}

fn default_tolerance() -> u64 {
    300
}

fn default_capture_paths() -> Vec<String> {
    vec!["/webhooks/*".to_string()]
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_log_level() -> String {
    "info,hookline=debug,tower_http=debug".to_string()
}
