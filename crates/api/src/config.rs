//! Application configuration loaded from environment variables.

use std::time::Duration;

use payments::{DEFAULT_RETURN_URL, YooKassaConfig};

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory stores when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `YOOKASSA_SHOP_ID`, `YOOKASSA_SECRET_KEY`: gateway credentials; the local
///   gateway is used unless both are set
/// - `YOOKASSA_BASE_URL`: API root (default: `https://api.yookassa.ru/v3`)
/// - `PAYMENT_RETURN_URL`: confirmation redirect target
/// - `GATEWAY_TIMEOUT_SECS`: per-request gateway timeout (default: `30`)
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub yookassa_shop_id: Option<String>,
    pub yookassa_secret_key: Option<String>,
    pub yookassa_base_url: String,
    pub payment_return_url: String,
    pub gateway_timeout_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: get("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            database_url: get("DATABASE_URL"),
            database_max_connections: get("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            yookassa_shop_id: get("YOOKASSA_SHOP_ID"),
            yookassa_secret_key: get("YOOKASSA_SECRET_KEY"),
            yookassa_base_url: get("YOOKASSA_BASE_URL").unwrap_or(defaults.yookassa_base_url),
            payment_return_url: get("PAYMENT_RETURN_URL").unwrap_or(defaults.payment_return_url),
            gateway_timeout_secs: get("GATEWAY_TIMEOUT_SECS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.gateway_timeout_secs),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the YooKassa settings when both credentials are configured.
    pub fn gateway_config(&self) -> Option<YooKassaConfig> {
        let shop_id = self.yookassa_shop_id.as_ref()?;
        let secret_key = self.yookassa_secret_key.as_ref()?;
        Some(
            YooKassaConfig::new(shop_id, secret_key)
                .with_base_url(&self.yookassa_base_url)
                .with_timeout(Duration::from_secs(self.gateway_timeout_secs)),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            yookassa_shop_id: None,
            yookassa_secret_key: None,
            yookassa_base_url: YooKassaConfig::DEFAULT_BASE_URL.to_string(),
            payment_return_url: DEFAULT_RETURN_URL.to_string(),
            gateway_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("database_max_connections", &self.database_max_connections)
            .field("yookassa_shop_id", &self.yookassa_shop_id)
            .field(
                "yookassa_secret_key",
                &self.yookassa_secret_key.as_ref().map(|_| "<redacted>"),
            )
            .field("yookassa_base_url", &self.yookassa_base_url)
            .field("payment_return_url", &self.payment_return_url)
            .field("gateway_timeout_secs", &self.gateway_timeout_secs)
            .finish()
    }
}
