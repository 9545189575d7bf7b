//! Environment-driven configuration.
//!
//! Recognized variables (all optional, with defaults):
//! - `DATABASE_URL`
//! - `BIND_ADDR`
//! - `PESSIMISTIC_LOCK_TIMEOUT_MS`: bounded wait for the exclusive row
//!   lock; expiry terminates the request with `rejected_lock_timeout`.
//! - `OPTIMISTIC_MAX_RETRIES`: CAS attempt budget; exhaustion terminates
//!   the request with `rejected_conflict`.
//! - `OPTIMISTIC_BASE_BACKOFF_MS`: base of the exponential retry delay.
//! - `RUST_LOG` / `LOG_LEVEL`: log filtering (see the observability crate).

use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub lock_timeout: Duration,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://user:password@db:5432/inventory_db".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            lock_timeout: Duration::from_millis(2000),
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env_or("DATABASE_URL", defaults.database_url),
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr),
            lock_timeout: Duration::from_millis(env_parse("PESSIMISTIC_LOCK_TIMEOUT_MS", 2000)),
            max_attempts: env_parse("OPTIMISTIC_MAX_RETRIES", 3),
            base_backoff: Duration::from_millis(env_parse("OPTIMISTIC_BASE_BACKOFF_MS", 50)),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "unparseable env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_knobs() {
        let config = ApiConfig::default();
        assert_eq!(config.lock_timeout, Duration::from_millis(2000));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_backoff, Duration::from_millis(50));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }
}
