use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Allowed browser origin. `None` means any origin.
    pub cors_origin: Option<String>,
    pub reset_url_base: String,
    pub session_ttl: chrono::Duration,
    pub db_busy_timeout: Duration,
    pub request_timeout: Duration,
    pub cleanup_interval: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("AGORA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("AGORA_JWT_SECRET is unset or still a placeholder");
        }

        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        Ok(Self {
            jwt_secret,
            db_path: string("AGORA_DB_PATH", "agora.db").into(),
            host: string("AGORA_HOST", "0.0.0.0"),
            port: parse(&lookup, "AGORA_PORT", 4000)?,
            cors_origin: lookup("AGORA_CORS_ORIGIN").filter(|s| !s.is_empty()),
            reset_url_base: string("AGORA_RESET_URL_BASE", "http://localhost:3000/forgot-password"),
            session_ttl: chrono::Duration::days(parse(&lookup, "AGORA_SESSION_TTL_DAYS", 30)?),
            db_busy_timeout: Duration::from_millis(parse(&lookup, "AGORA_DB_BUSY_TIMEOUT_MS", 5000)?),
            request_timeout: Duration::from_secs(parse(&lookup, "AGORA_REQUEST_TIMEOUT_SECS", 30)?),
            cleanup_interval: Duration::from_secs(parse(&lookup, "AGORA_CLEANUP_INTERVAL_SECS", 3600)?),
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.parse().with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("AGORA_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.db_path, PathBuf::from("agora.db"));
        assert_eq!(cfg.session_ttl, chrono::Duration::days(30));
        assert_eq!(cfg.cleanup_interval, Duration::from_secs(3600));
        assert!(cfg.cors_origin.is_none());
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("AGORA_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn bad_number_is_reported() {
        let err = config(&[("AGORA_JWT_SECRET", "s3cret"), ("AGORA_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("AGORA_PORT"));
    }
}
