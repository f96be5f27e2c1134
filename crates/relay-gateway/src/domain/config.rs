//! Relay configuration with validation.
//!
//! Layering: built-in defaults, then an optional JSON file, then environment
//! overrides (see [`RelayConfig::apply_env`]).

use crate::domain::access::{AccessMode, IpPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Main relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Shared secrets
    pub auth: AuthConfig,
    /// Initial IP access policy
    pub access: AccessConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Outbound notification configuration
    pub notify: NotifyConfig,
}

impl RelayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::InvalidLimit("http.port cannot be 0".into()));
        }

        if self.http.max_body_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "http.max_body_bytes cannot be 0".into(),
            ));
        }

        if self.http.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "http.request_timeout cannot be 0".into(),
            ));
        }

        if self.rate_limit.requests_per_second == 0 || self.rate_limit.writes_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "per-second limits cannot be 0".into(),
            ));
        }

        if self.notify.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "notify.timeout cannot be 0".into(),
            ));
        }

        if let Some(url) = &self.notify.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "notify.webhook_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }

        for (name, key) in [
            ("auth.api_key", &self.auth.api_key),
            ("auth.admin_key", &self.auth.admin_key),
        ] {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("{name} cannot be empty")));
            }
        }

        // Compared in the trimmed form the policy is seeded with
        let blocked: HashSet<&str> = self.access.blocked.iter().map(|ip| ip.trim()).collect();
        if let Some(both) = self
            .access
            .allowed
            .iter()
            .map(|ip| ip.trim())
            .find(|ip| blocked.contains(ip))
        {
            return Err(ConfigError::Invalid(format!(
                "address '{}' is in both access.blocked and access.allowed",
                both
            )));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Read a JSON config file; missing sections fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Load defaults, then `RELAY_CONFIG` (if set), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("RELAY_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    ///
    /// Recognized keys: `RELAY_HOST`, `RELAY_PORT`, `RELAY_API_KEY`,
    /// `RELAY_ADMIN_KEY`, `RELAY_WEBHOOK_URL`, `RELAY_IP_MODE`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("RELAY_HOST") {
            self.http.host = host
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("RELAY_HOST: bad address '{}'", host)))?;
        }
        if let Some(port) = lookup("RELAY_PORT") {
            self.http.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("RELAY_PORT: bad port '{}'", port)))?;
        }
        if let Some(key) = lookup("RELAY_API_KEY") {
            self.auth.api_key = Some(key);
        }
        if let Some(key) = lookup("RELAY_ADMIN_KEY") {
            self.auth.admin_key = Some(key);
        }
        if let Some(url) = lookup("RELAY_WEBHOOK_URL") {
            self.notify.webhook_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
        }
        if let Some(mode) = lookup("RELAY_IP_MODE") {
            self.access.mode = mode
                .trim()
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("RELAY_IP_MODE: {}", e)))?;
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 3000)
    pub port: u16,
    /// Whole-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            request_timeout: Duration::from_secs(15),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Shared secrets for event and admin endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// `X-API-Key` for checkout/payment (None = not required)
    pub api_key: Option<String>,
    /// `X-Admin-Key` for admin endpoints (None = admin surface disabled)
    pub admin_key: Option<String>,
}

/// Initial IP access policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub mode: AccessMode,
    pub blocked: Vec<String>,
    pub allowed: Vec<String>,
}

impl AccessConfig {
    /// Build the starting policy from the configured mode and seed lists.
    pub fn initial_policy(&self) -> IpPolicy {
        let mut policy = IpPolicy::new(self.mode);
        for ip in &self.blocked {
            policy.block(ip.trim());
        }
        for ip in &self.allowed {
            policy.allow(ip.trim());
        }
        policy
    }
}

/// Per-client rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Requests per second per client (all endpoints)
    pub requests_per_second: u32,
    /// Requests per second per client on checkout/payment
    pub writes_per_second: u32,
    /// Burst allowance (token bucket)
    pub burst_size: u32,
    /// Transport peer addresses never rate limited. Matched against the
    /// connection, never against forwarded headers.
    pub exempt: Vec<String>,
    /// Idle buckets older than this are dropped
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 20,
            writes_per_second: 5,
            burst_size: 40,
            exempt: Vec::new(),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "X-API-Key".to_string(),
                "X-Admin-Key".to_string(),
            ],
            max_age: 86400, // 24 hours
        }
    }
}

/// Outbound chat webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Chat webhook URL (None = log notifications instead of sending)
    pub webhook_url: Option<String>,
    /// Display name used for relayed messages
    pub username: String,
    /// Timeout for one webhook delivery
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: "Store Relay".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Config file could not be read
    #[error("cannot read config file: {0}")]
    Io(String),
    /// Config file is not valid JSON for this schema
    #[error("cannot parse config file: {0}")]
    Parse(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Duration as a short human string: "15s", "500ms", "2m" or bare seconds
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() != 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be tried before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
