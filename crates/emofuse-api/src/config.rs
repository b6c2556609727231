//! API configuration.

use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Per-modality inference deadline (none = wait indefinitely)
    pub inference_deadline: Option<Duration>,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 20 * 1024 * 1024, // 20MB
            inference_deadline: Some(Duration::from_secs(30)),
            metrics_enabled: true,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            inference_deadline: match std::env::var("INFERENCE_DEADLINE_MS") {
                Ok(raw) => parse_deadline(&raw).unwrap_or(defaults.inference_deadline),
                Err(_) => defaults.inference_deadline,
            },
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// `0` disables the deadline; garbage yields `None` so the default applies.
fn parse_deadline(raw: &str) -> Option<Option<Duration>> {
    let ms: u64 = raw.trim().parse().ok()?;
    Some((ms > 0).then(|| Duration::from_millis(ms)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.cors_origins, vec!["*"]);
        assert_eq!(config.inference_deadline, Some(Duration::from_secs(30)));
        assert!(!config.is_production());
    }

    #[test]
    fn test_parse_deadline() {
        assert_eq!(parse_deadline("1500"), Some(Some(Duration::from_millis(1500))));
        assert_eq!(parse_deadline("0"), Some(None));
        assert_eq!(parse_deadline("soon"), None);
    }

    #[test]
    fn test_is_production_ignores_case() {
        let config = ApiConfig {
            environment: "Production".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.is_production());
    }
}
