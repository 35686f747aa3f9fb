//! Server configuration, read from the environment (and `.env`).

use anyhow::{Context, Result};
use chrono::Duration;
use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::auth::{GRANT_TTL_MINUTES, SESSION_TTL_MINUTES};
use crate::catalog::{CatalogFile, CatalogIndex};

pub const DEFAULT_SECRET: &str = "change-me-in-production";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub secret_key: String,
    pub username: String,
    pub password: String,
    pub videos_dir: PathBuf,
    /// `None` selects the built-in catalog.
    pub catalog_path: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub bind_addr: String,
    pub session_ttl: Duration,
    pub grant_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET.to_string(),
            username: "admin".to_string(),
            password: "admin123".to_string(),
            videos_dir: PathBuf::from("videos"),
            catalog_path: None,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            bind_addr: "0.0.0.0:8000".to_string(),
            session_ttl: Duration::minutes(SESSION_TTL_MINUTES),
            grant_ttl: Duration::minutes(GRANT_TTL_MINUTES),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let secret_key = match get("SECRET_KEY") {
            Some(secret) => secret,
            None => {
                warn!("SECRET_KEY is not set; using the insecure development default");
                defaults.secret_key
            }
        };

        let minutes = |key: &str, fallback: Duration| -> Result<Duration> {
            match get(key) {
                Some(raw) => {
                    let value: i64 = raw
                        .trim()
                        .parse()
                        .with_context(|| format!("{} must be a whole number of minutes", key))?;
                    anyhow::ensure!(value > 0, "{} must be positive", key);
                    Ok(Duration::minutes(value))
                }
                None => Ok(fallback),
            }
        };

        Ok(Self {
            secret_key,
            username: get("DEMO_USER").unwrap_or(defaults.username),
            password: get("DEMO_PASS").unwrap_or(defaults.password),
            videos_dir: get("VIDEOS_DIR").map(PathBuf::from).unwrap_or(defaults.videos_dir),
            catalog_path: get("CATALOG_PATH").map(PathBuf::from),
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.allowed_origins),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_ttl: minutes("SESSION_TTL_MINUTES", defaults.session_ttl)?,
            grant_ttl: minutes("GRANT_TTL_MINUTES", defaults.grant_ttl)?,
        })
    }

    /// Load and validate the configured catalog.
    pub fn load_catalog(&self) -> Result<CatalogIndex> {
        let file = match &self.catalog_path {
            Some(path) => CatalogFile::load(path)
                .with_context(|| format!("Failed to load catalog from {}", path.display()))?,
            None => CatalogFile::builtin(),
        };
        CatalogIndex::from_file(file).context("Invalid catalog configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.secret_key, DEFAULT_SECRET);
        assert_eq!(config.username, "admin");
        assert_eq!(config.session_ttl, Duration::hours(24));
        assert_eq!(config.grant_ttl, Duration::minutes(30));
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("SECRET_KEY", "s3cret"),
            ("DEMO_USER", "coach"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("GRANT_TTL_MINUTES", "5"),
            ("VIDEOS_DIR", "/srv/videos"),
        ]))
        .unwrap();
        assert_eq!(config.secret_key, "s3cret");
        assert_eq!(config.username, "coach");
        assert_eq!(config.allowed_origins, ["https://a.example", "https://b.example"]);
        assert_eq!(config.grant_ttl, Duration::minutes(5));
        assert_eq!(config.videos_dir, PathBuf::from("/srv/videos"));
    }

    #[test]
    fn test_bad_ttl_is_rejected() {
        assert!(ServerConfig::from_lookup(lookup(&[("GRANT_TTL_MINUTES", "soon")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("SESSION_TTL_MINUTES", "0")])).is_err());
    }

    #[test]
    fn test_load_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "dimensions:\n  - name: own\nentries:\n  - key: [\"4-3-3\"]\n    video: a.mp4\n",
        )
        .unwrap();

        let config = ServerConfig { catalog_path: Some(path), ..ServerConfig::default() };
        let index = config.load_catalog().unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_bad_catalog_file_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "dimensions:\n  - name: own\nentries:\n  - key: [\"4-3-3\"]\n    video: ../a.mp4\n",
        )
        .unwrap();

        let config = ServerConfig { catalog_path: Some(path), ..ServerConfig::default() };
        assert!(config.load_catalog().is_err());

        let missing = ServerConfig {
            catalog_path: Some(dir.path().join("absent.yaml")),
            ..ServerConfig::default()
        };
        assert!(missing.load_catalog().is_err());
    }
}
