use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub cache_ttl_minutes: u64,
    pub cache_capacity: usize,
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    /// Provider credential. Absence forces `unavailable` health.
    pub api_key: Option<Secret<String>>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("EXGATE_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map EXGATE__UPSTREAM__API_KEY to upstream.api_key
            .add_source(Environment::with_prefix("EXGATE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8001,
            },
            gateway: GatewayConfig {
                cache_ttl_minutes: 60,
                cache_capacity: 1000,
                rate_limit_per_minute: 15,
            },
            upstream: UpstreamConfig {
                base_url: "https://api.tavily.com".into(),
                timeout_seconds: 30,
                max_retries: 2,
                api_key: None,
            },
        }
    }
}
