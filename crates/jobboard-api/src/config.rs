//! API configuration.

use std::time::Duration;

use jobboard_client::{BoardConfig, CacheConfig, DEFAULT_CAPACITY, DEFAULT_DEDUPE_INTERVAL};
use jobboard_models::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Listings per page
    pub page_size: u32,
    /// Window in which repeated reads of one key share a fetch
    pub cache_dedupe_interval: Duration,
    /// Max cached entries per view kind
    pub cache_capacity: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 1024 * 1024, // 1MB
            page_size: DEFAULT_PAGE_SIZE,
            cache_dedupe_interval: DEFAULT_DEDUPE_INTERVAL,
            cache_capacity: DEFAULT_CAPACITY,
            environment: "development".to_string(),
            metrics_enabled: true,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            page_size: env_parse::<u32>("PAGE_SIZE")
                .map(|n| n.clamp(1, MAX_PAGE_SIZE))
                .unwrap_or(defaults.page_size),
            cache_dedupe_interval: env_parse("CACHE_DEDUPE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_dedupe_interval),
            cache_capacity: env_parse::<usize>("CACHE_CAPACITY")
                .map(|n| n.max(1))
                .unwrap_or(defaults.cache_capacity),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Job board settings derived from this config.
    pub fn board_config(&self) -> BoardConfig {
        BoardConfig {
            page_size: self.page_size,
            cache: CacheConfig {
                dedupe_interval: self.cache_dedupe_interval,
                capacity: self.cache_capacity,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "API_PORT",
        "CORS_ORIGINS",
        "PAGE_SIZE",
        "CACHE_DEDUPE_MS",
        "METRICS_ENABLED",
        "ENVIRONMENT",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear();
        let config = ApiConfig::from_env();
        assert_eq!(config.port, 8000);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
        assert!(config.metrics_enabled);
        assert!(!config.is_production());
    }

    #[test]
    #[serial]
    fn test_reads_env_overrides() {
        clear();
        std::env::set_var("API_PORT", "9090");
        std::env::set_var("CORS_ORIGINS", "https://a.example, https://b.example,");
        std::env::set_var("PAGE_SIZE", "500");
        std::env::set_var("CACHE_DEDUPE_MS", "250");
        std::env::set_var("METRICS_ENABLED", "false");
        std::env::set_var("ENVIRONMENT", "Production");

        let config = ApiConfig::from_env();
        clear();

        assert_eq!(config.port, 9090);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.page_size, MAX_PAGE_SIZE);
        assert_eq!(config.board_config().cache.dedupe_interval, Duration::from_millis(250));
        assert!(!config.metrics_enabled);
        assert!(config.is_production());
    }
}
