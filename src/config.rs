use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub lock_retries: u32,
    pub lock_interval_ms: u64,
    pub lock_ttl_secs: u64,
    pub busy_cache_ttl_secs: u64,
    pub busy_cache_negative_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a number"),
            lock_retries: env_or("LOCK_RETRIES", 50),
            lock_interval_ms: env_or("LOCK_INTERVAL_MS", 100),
            lock_ttl_secs: env_or("LOCK_TTL_SECS", 10),
            busy_cache_ttl_secs: env_or("BUSY_CACHE_TTL_SECS", 300),
            busy_cache_negative_ttl_secs: env_or("BUSY_CACHE_NEGATIVE_TTL_SECS", 30),
        }
    }

    pub fn for_tests(database_url: String) -> Self {
        Self {
            database_url,
            port: 0,
            lock_retries: 50,
            lock_interval_ms: 100,
            lock_ttl_secs: 10,
            busy_cache_ttl_secs: 300,
            busy_cache_negative_ttl_secs: 30,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
