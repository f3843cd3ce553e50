//! Boot-time configuration (SPEC_FULL.md §3.1). Required variables panic
//! with a clear message on absence, the same convention the teacher's
//! `main.rs` uses for `DATABASE_URL`; everything else falls back to a
//! documented default.

use std::env;

pub struct Config {
    pub jwt_secret: String,
    pub redis_url: String,
    pub database_url: String,
    pub bind_addr: String,
    pub log_level: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u32,
    pub search_idle_timeout_ms: i64,
    pub room_heartbeat_timeout_ms: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            redis_url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned()),
            rate_limit_window_ms: parse_env_or("RATE_LIMIT_WINDOW_MS", 1_000),
            rate_limit_max: parse_env_or("RATE_LIMIT_MAX", 10),
            search_idle_timeout_ms: parse_env_or("SEARCH_IDLE_TIMEOUT_MS", 30_000),
            room_heartbeat_timeout_ms: parse_env_or("ROOM_HEARTBEAT_TIMEOUT_MS", 10_000),
        }
    }

    /// Builds a config from explicit values with every optional field
    /// defaulted, for use by tests that construct `AppState` directly.
    #[cfg(test)]
    pub fn from_parts(jwt_secret: String, redis_url: String, database_url: String) -> Self {
        Self {
            jwt_secret,
            redis_url,
            database_url,
            bind_addr: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            rate_limit_window_ms: 1_000,
            rate_limit_max: 10,
            search_idle_timeout_ms: 30_000,
            room_heartbeat_timeout_ms: 10_000,
        }
    }
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
