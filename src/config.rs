use std::time::Duration;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub migration_lock_timeout: Duration,
    pub migration_lock_poll: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://filmcatalog.db?mode=rwc".to_string());

        let max_connections: u32 = var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .context("DB_MAX_CONNECTIONS")?;

        let lock_timeout_ms: u64 = var("MIGRATION_LOCK_TIMEOUT_MS")
            .unwrap_or_else(|| "30000".to_string())
            .parse()
            .context("MIGRATION_LOCK_TIMEOUT_MS")?;

        let lock_poll_ms: u64 = var("MIGRATION_LOCK_POLL_MS")
            .unwrap_or_else(|| "100".to_string())
            .parse()
            .context("MIGRATION_LOCK_POLL_MS")?;

        Ok(Self {
            database_url,
            max_connections,
            migration_lock_timeout: Duration::from_millis(lock_timeout_ms),
            migration_lock_poll: Duration::from_millis(lock_poll_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.migration_lock_timeout, Duration::from_secs(30));
        assert_eq!(config.migration_lock_poll, Duration::from_millis(100));
    }

    #[test]
    fn malformed_values_name_the_variable() {
        for name in ["DB_MAX_CONNECTIONS", "MIGRATION_LOCK_TIMEOUT_MS", "MIGRATION_LOCK_POLL_MS"] {
            let err = load(&[(name, "soon")]).unwrap_err();
            assert_eq!(err.to_string(), name);
        }
    }

    #[test]
    fn explicit_values_are_used() {
        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("MIGRATION_LOCK_POLL_MS", "25"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.migration_lock_poll, Duration::from_millis(25));
    }
}
