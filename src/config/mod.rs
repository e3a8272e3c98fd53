// src/config/mod.rs
pub mod generation;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub use generation::{GenerationConfig, ValidationMode};

const ENV_PATH: &str = "DIGEST_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/digest.toml";

/// Paths, URLs and timings shared by the producer, the popup and the artifact server.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DigestConfig {
    /// Where the producer writes and the server reads the artifact.
    pub artifact_path: PathBuf,
    /// Where the popup fetches the artifact from.
    pub artifact_url: String,
    /// Popup cache file.
    pub cache_path: PathBuf,
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Provenance stamped into fresh digests.
    pub version: String,
    pub source: String,
    pub bind_addr: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("news.json"),
            artifact_url: "http://127.0.0.1:8000/news.json".to_string(),
            cache_path: PathBuf::from("cache/news_cache.json"),
            cache_ttl_secs: 6 * 60 * 60,
            fetch_timeout_secs: 10,
            version: env!("CARGO_PKG_VERSION").to_string(),
            source: "gemini".to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl DigestConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Load from an explicit TOML path. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading digest config from {}", path.display()))?;
        let cfg: DigestConfig = toml::from_str(&content)
            .with_context(|| format!("parsing digest config {}", path.display()))?;
        Ok(cfg.with_env_overrides().sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $DIGEST_CONFIG_PATH
    /// 2) config/digest.toml
    /// 3) built-in defaults
    ///
    /// `DIGEST_ARTIFACT_PATH`, `DIGEST_ARTIFACT_URL` and `DIGEST_BIND_ADDR` override
    /// whatever was loaded.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("DIGEST_CONFIG_PATH points to non-existent path"));
            }
        }
        let default_p = PathBuf::from(DEFAULT_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(DigestConfig::default().with_env_overrides().sanitized())
    }

    /// Zero TTL or zero fetch timeout would make the popup useless; reset them to defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = DigestConfig::default();
        if self.cache_ttl_secs == 0 {
            warn!(target: "config", "cache_ttl_secs = 0, using {}", defaults.cache_ttl_secs);
            self.cache_ttl_secs = defaults.cache_ttl_secs;
        }
        if self.fetch_timeout_secs == 0 {
            warn!(target: "config", "fetch_timeout_secs = 0, using {}", defaults.fetch_timeout_secs);
            self.fetch_timeout_secs = defaults.fetch_timeout_secs;
        }
        self
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("DIGEST_ARTIFACT_PATH") {
            self.artifact_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DIGEST_ARTIFACT_URL") {
            self.artifact_url = v;
        }
        if let Ok(v) = std::env::var("DIGEST_BIND_ADDR") {
            self.bind_addr = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: DigestConfig = toml::from_str(
            r#"
artifact_url = "https://example.org/news.json"
cache_ttl_secs = 60
"#,
        )
        .unwrap();
        assert_eq!(cfg.artifact_url, "https://example.org/news.json");
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(60));
        assert_eq!(cfg.artifact_path, PathBuf::from("news.json"));
        assert_eq!(cfg.fetch_timeout_secs, 10);
    }

    #[test]
    fn zero_ttl_and_timeout_fall_back_to_defaults() {
        let cfg: DigestConfig =
            toml::from_str("cache_ttl_secs = 0\nfetch_timeout_secs = 0\n").unwrap();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.cache_ttl_secs, 21_600);
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn load_from_sanitizes() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("digest.toml");
        fs::write(&p, "fetch_timeout_secs = 0\ncache_ttl_secs = 30\n").unwrap();
        let cfg = DigestConfig::load_from(&p).unwrap();
        assert_eq!(cfg.fetch_timeout_secs, 10);
        assert_eq!(cfg.cache_ttl_secs, 30);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so a real config/ in the repo does not interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);
        env::remove_var("DIGEST_ARTIFACT_URL");

        // No files in temp CWD -> defaults
        let v = DigestConfig::load_default().unwrap();
        assert_eq!(v.cache_ttl_secs, 21_600);

        // Fallback TOML in ./config/
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join(DEFAULT_PATH), "cache_ttl_secs = 120\n").unwrap();
        let vt = DigestConfig::load_default().unwrap();
        assert_eq!(vt.cache_ttl_secs, 120);

        // Env path wins, and env overrides apply on top
        let p_env = tmp.path().join("other.toml");
        fs::write(&p_env, "cache_ttl_secs = 5\n").unwrap();
        env::set_var(ENV_PATH, p_env.display().to_string());
        env::set_var("DIGEST_ARTIFACT_URL", "http://localhost:1/n.json");
        let ve = DigestConfig::load_default().unwrap();
        assert_eq!(ve.cache_ttl_secs, 5);
        assert_eq!(ve.artifact_url, "http://localhost:1/n.json");
        env::remove_var(ENV_PATH);
        env::remove_var("DIGEST_ARTIFACT_URL");

        // Missing env path is an error
        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(DigestConfig::load_default().is_err());
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
