use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

pub const BASE_URL_ENV: &str = "SPORTYODDS_BASE_URL";
pub const BROWSER_PROFILE_ENV: &str = "SPORTYODDS_BROWSER_PROFILE";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub rate_limit: RateLimitConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    pub base_url: String,
    pub cache_ttl_seconds: u64,
    pub request_timeout_seconds: u64,
    /// Try the browser-profile client before the baseline one.
    #[serde(default = "default_browser_profile")]
    pub browser_profile: bool,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

fn default_browser_profile() -> bool {
    true
}

impl ScraperConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.sportybet.com/api/ng".to_string(),
            cache_ttl_seconds: 300,
            request_timeout_seconds: 15,
            browser_profile: true,
            rate_limit: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from a TOML file, after reading `.env`.
    ///
    /// Environment overrides are not applied here; call
    /// [`AppConfig::apply_env_overrides`] once logging is up so that rejected
    /// values are reported.
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(contents)?;
        // The transport only sees ScraperConfig, so the top-level limiter rides along.
        if config.scraper.rate_limit.is_none() {
            config.scraper.rate_limit = Some(config.rate_limit.clone());
        }
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay `SPORTYODDS_*` values obtained through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            let base_url = base_url.trim();
            if base_url.is_empty() {
                warn!(var = BASE_URL_ENV, "Ignoring empty override");
            } else {
                info!(var = BASE_URL_ENV, base_url, "Base URL overridden");
                self.scraper.base_url = base_url.to_string();
            }
        }

        if let Some(raw) = lookup(BROWSER_PROFILE_ENV) {
            match parse_flag(&raw) {
                Some(enabled) => self.scraper.browser_profile = enabled,
                None => warn!(var = BROWSER_PROFILE_ENV, value = %raw, "Ignoring unrecognized flag"),
            }
        }
    }
}

/// `1/true/yes/on` or `0/false/no/off`, case-insensitive.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
