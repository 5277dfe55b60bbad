use std::time::Duration;

use anyhow::{bail, Context};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub page_size: u32,
    pub base_path: String,
    pub seed: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port: u16 = match get("TODO_API_PORT") {
            Some(v) => v.parse().context("TODO_API_PORT must be a port number")?,
            None => 3000,
        };

        let jwt_secret = get("TODO_API_JWT_SECRET").context("TODO_API_JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            bail!("TODO_API_JWT_SECRET must not be empty");
        }

        let ttl_hours: u64 = match get("TODO_API_TOKEN_TTL_HOURS") {
            Some(v) => v
                .parse()
                .context("TODO_API_TOKEN_TTL_HOURS must be a whole number of hours")?,
            None => 24,
        };

        let page_size: u32 = match get("TODO_API_PAGE_SIZE") {
            Some(v) => v.parse().context("TODO_API_PAGE_SIZE must be a number")?,
            None => 25,
        };
        if page_size == 0 {
            bail!("TODO_API_PAGE_SIZE must be at least 1");
        }

        let seed = get("TODO_API_SEED")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            port,
            database_path: get("TODO_API_DATABASE").unwrap_or_else(|| "todos.db".to_string()),
            jwt_secret,
            token_ttl: Duration::from_secs(ttl_hours.saturating_mul(60 * 60)),
            page_size,
            base_path: get("TODO_API_BASE_PATH")
                .map(|p| normalize_base_path(&p))
                .unwrap_or_default(),
            seed,
        })
    }
}

pub fn normalize_base_path(path: &str) -> String {
    let path = path.trim_end_matches('/');
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
