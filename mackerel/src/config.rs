use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub resolution: ResolutionConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

/// Review queue assembly settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Page size when the request does not specify one.
    pub default_limit: u32,
    /// Hard cap on the per-source request size.
    pub max_limit: u32,
    /// Per-source fetch timeout. A source that exceeds it contributes zero
    /// candidates and a diagnostic note; the other sources are unaffected.
    pub source_timeout_secs: u64,
}

/// Resolution dispatch settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionConfig {
    /// Maximum in-flight resolutions during a batch request.
    pub batch_concurrency: usize,
}

/// Duplicate-detection scan settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Jaro-Winkler similarity at which two names count as agreeing
    /// when combined with a shared phone number.
    pub name_agreement_threshold: f64,
    /// Jaro-Winkler similarity required for a name-only candidate.
    pub weak_name_threshold: f64,
    /// Run the background detection scan.
    pub scan_enabled: bool,
    pub scan_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("MACKEREL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("MACKEREL_PORT", 3000),
                api_keys: env::var("MACKEREL_API_KEYS")
                    .map(|keys| keys.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:mackerel.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            queue: QueueConfig {
                default_limit: parse_env_or("QUEUE_DEFAULT_LIMIT", 25),
                max_limit: parse_env_or("QUEUE_MAX_LIMIT", 200),
                source_timeout_secs: parse_env_or("QUEUE_SOURCE_TIMEOUT_SECS", 10),
            },
            resolution: ResolutionConfig {
                batch_concurrency: parse_env_or("RESOLVE_BATCH_CONCURRENCY", 4),
            },
            matching: MatchingConfig {
                name_agreement_threshold: parse_env_or("MATCH_NAME_THRESHOLD", 0.85),
                weak_name_threshold: parse_env_or("MATCH_WEAK_NAME_THRESHOLD", 0.92),
                scan_enabled: parse_env_or("SCAN_ENABLED", false),
                scan_interval_secs: parse_env_or("SCAN_INTERVAL_SECS", 3600),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_queue_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("QUEUE_DEFAULT_LIMIT");
        std::env::remove_var("QUEUE_MAX_LIMIT");
        std::env::remove_var("QUEUE_SOURCE_TIMEOUT_SECS");

        let config = Config::default();
        assert_eq!(config.queue.default_limit, 25);
        assert_eq!(config.queue.max_limit, 200);
        assert_eq!(config.queue.source_timeout_secs, 10);
    }

    #[test]
    fn test_queue_config_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("QUEUE_DEFAULT_LIMIT", "50");
        std::env::set_var("QUEUE_SOURCE_TIMEOUT_SECS", "3");

        let config = Config::default();
        assert_eq!(config.queue.default_limit, 50);
        assert_eq!(config.queue.source_timeout_secs, 3);

        std::env::remove_var("QUEUE_DEFAULT_LIMIT");
        std::env::remove_var("QUEUE_SOURCE_TIMEOUT_SECS");
    }

    #[test]
    fn test_matching_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("MATCH_NAME_THRESHOLD");
        std::env::remove_var("MATCH_WEAK_NAME_THRESHOLD");
        std::env::remove_var("SCAN_ENABLED");

        let config = Config::default();
        assert_eq!(config.matching.name_agreement_threshold, 0.85);
        assert_eq!(config.matching.weak_name_threshold, 0.92);
        assert!(!config.matching.scan_enabled);
        assert_eq!(config.matching.scan_interval_secs, 3600);
    }

    #[test]
    fn test_matching_scan_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("SCAN_ENABLED", "true");
        std::env::set_var("SCAN_INTERVAL_SECS", "600");

        let config = Config::default();
        assert!(config.matching.scan_enabled);
        assert_eq!(config.matching.scan_interval_secs, 600);

        std::env::remove_var("SCAN_ENABLED");
        std::env::remove_var("SCAN_INTERVAL_SECS");
    }

    #[test]
    fn test_resolution_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::remove_var("RESOLVE_BATCH_CONCURRENCY");
        let config = Config::default();
        assert_eq!(config.resolution.batch_concurrency, 4);
    }

    #[test]
    fn test_api_keys_split_and_trimmed() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("MACKEREL_API_KEYS", "alpha, beta ,gamma");
        let config = Config::default();
        assert_eq!(config.server.api_keys, vec!["alpha", "beta", "gamma"]);
        std::env::remove_var("MACKEREL_API_KEYS");
    }

    #[test]
    fn test_parse_env_or_invalid_falls_back() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("__TEST_PARSE_LIMIT", "not-a-number");
        let result: u32 = parse_env_or("__TEST_PARSE_LIMIT", 25);
        assert_eq!(result, 25);
        std::env::remove_var("__TEST_PARSE_LIMIT");
    }
}
