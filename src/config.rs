use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_base_url() -> String { "https://api.open-meteo.com".to_string() }
fn default_timeout_seconds() -> u64 { 30 }
fn default_max_retries() -> u32 { 1 }
fn default_retry_backoff_ms() -> u64 { 500 }
fn default_model_path() -> PathBuf { PathBuf::from("models/wind_generation_forest.json") }
fn default_latitude() -> f64 { -33.45 }
fn default_longitude() -> f64 { -70.66 }
fn default_zoom() -> u8 { 5 }
fn default_span_days() -> u32 { 2 }
fn default_max_span_days() -> u32 { 16 }
fn default_static_dir() -> PathBuf { PathBuf::from("static") }

/// Open-Meteo serves at most 16 days of hourly forecast.
pub const MAX_FORECAST_SPAN_DAYS: u32 = 16;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Open-Meteo endpoint and the transport policy around it.
#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Extra attempts after the first one, only for transport errors and 5xx.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SelectionConfig {
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,
    #[serde(default = "default_longitude")]
    pub default_longitude: f64,
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,
    #[serde(default = "default_span_days")]
    pub default_span_days: u32,
    #[serde(default = "default_max_span_days")]
    pub max_span_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            forecast: ForecastConfig::default(),
            model: ModelConfig::default(),
            selection: SelectionConfig::default(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { path: default_model_path() }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            default_zoom: default_zoom(),
            default_span_days: default_span_days(),
            max_span_days: default_max_span_days(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let selection = &self.selection;
        if selection.max_span_days > MAX_FORECAST_SPAN_DAYS {
            anyhow::bail!(
                "selection.max_span_days is {}, the forecast covers at most {} days",
                selection.max_span_days,
                MAX_FORECAST_SPAN_DAYS
            );
        }
        Ok(())
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    /// A file that exists and fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg = Config::from_json_str(
            r#"{ "server": { "port": 9000 }, "forecast": { "max_retries": 0 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.forecast.max_retries, 0);
        assert_eq!(cfg.forecast.base_url, "https://api.open-meteo.com");
        assert_eq!(cfg.selection.max_span_days, 16);
        assert_eq!(cfg.selection.default_zoom, 5);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let cfg = Config::load_or_default("does/not/exist.json").unwrap();
        assert_eq!(cfg.selection.default_latitude, -33.45);
        assert_eq!(cfg.selection.default_longitude, -70.66);
        assert_eq!(cfg.model.path, PathBuf::from("models/wind_generation_forest.json"));
    }

    #[test]
    fn test_span_beyond_forecast_horizon_is_rejected() {
        let err = Config::from_json_str(r#"{ "selection": { "max_span_days": 30 } }"#).unwrap_err();
        assert!(err.to_string().contains("max_span_days is 30"));

        let cfg = Config::from_json_str(r#"{ "selection": { "max_span_days": 7 } }"#).unwrap();
        assert_eq!(cfg.selection.max_span_days, 7);
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig { host: "127.0.0.1".into(), port: 3000 };
        assert_eq!(server.socket_addr().unwrap().port(), 3000);
    }
}
