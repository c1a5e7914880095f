//! Dual-strategy HTTP transport.
//!
//! A browser-profile client is tried first. When it is unavailable, or
//! fails before the upstream has given a verdict, a baseline client with a
//! rotated User-Agent takes over. Both run the same validator, so callers
//! cannot tell which one served a response.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::{RateLimitConfig, ScraperConfig};
use crate::scraper::error::ScraperError;
use crate::scraper::validate::validate;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Query parameter carrying the cache-busting request timestamp.
pub const CACHE_BUSTER_PARAM: &str = "_t";

/// Pool the baseline client picks from on every request.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
];

const BROWSER_USER_AGENT: &str = USER_AGENTS[0];
const ORIGIN: &str = "https://www.sportybet.com";
const REFERER: &str = "https://www.sportybet.com/ng/";

/// Which client produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    BrowserProfile,
    Baseline,
}

/// Fetches one upstream document.
///
/// Implementations report upstream verdicts as [`ScraperError`]; anything
/// else they return is treated as unexpected by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<Value>;

    fn name(&self) -> &str;
}

/// Browser-profile client: a full, consistent Chrome header set, a cookie
/// jar and negotiated compression/HTTP2, so requests look like a page
/// script rather than a bare library call.
///
/// Only the HTTP layer is shaped. The TLS ClientHello is still rustls's, so
/// services that fingerprint the handshake can tell it apart from Chrome.
pub struct BrowserTransport {
    client: reqwest::Client,
}

impl BrowserTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = common_headers();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            "sec-ch-ua",
            HeaderValue::from_static(r#""Chromium";v="122", "Not(A:Brand";v="24", "Google Chrome";v="122""#),
        );
        headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        headers.insert("sec-ch-ua-platform", HeaderValue::from_static(r#""Windows""#));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .context("Failed to create browser-profile HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for BrowserTransport {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let request = self.client.get(url).query(params);
        send(request, url, Strategy::BrowserProfile).await
    }

    fn name(&self) -> &str {
        "browser"
    }
}

/// Plain client; the User-Agent is drawn from [`USER_AGENTS`] per request.
pub struct BaselineTransport {
    client: reqwest::Client,
}

impl BaselineTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(common_headers())
            .gzip(true)
            .build()
            .context("Failed to create baseline HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for BaselineTransport {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let user_agent = random_user_agent();
        let request = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .query(params);
        send(request, url, Strategy::Baseline).await
    }

    fn name(&self) -> &str {
        "baseline"
    }
}

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(BROWSER_USER_AGENT)
}

fn common_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(header::ORIGIN, HeaderValue::from_static(ORIGIN));
    headers.insert(header::REFERER, HeaderValue::from_static(REFERER));
    headers
}

async fn send(request: reqwest::RequestBuilder, url: &str, strategy: Strategy) -> Result<Value> {
    let response = request
        .send()
        .await
        .map_err(|e| ScraperError::transport(url, e))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| ScraperError::transport(url, e))?;

    debug!(url, status, bytes = body.len(), ?strategy, "Upstream responded");

    Ok(validate(status, &body, url, strategy)?)
}

/// Primary-then-secondary policy with a shared cache buster and throttle.
pub struct FallbackTransport {
    primary: Option<Box<dyn Transport>>,
    secondary: Box<dyn Transport>,
    limiter: Option<Arc<Limiter>>,
}

impl FallbackTransport {
    pub fn new(primary: Option<Box<dyn Transport>>, secondary: Box<dyn Transport>) -> Self {
        Self {
            primary,
            secondary,
            limiter: None,
        }
    }

    pub fn with_rate_limit(mut self, config: &RateLimitConfig) -> Self {
        self.limiter = Some(create_rate_limiter(config));
        self
    }

    /// Build both strategies from configuration. The browser profile is
    /// skipped when disabled or when its client cannot be constructed.
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let timeout = config.request_timeout();

        let primary: Option<Box<dyn Transport>> = if config.browser_profile {
            match BrowserTransport::new(timeout) {
                Ok(browser) => Some(Box::new(browser)),
                Err(e) => {
                    warn!(error = %e, "Browser-profile client unavailable — using baseline only");
                    None
                }
            }
        } else {
            None
        };
        let secondary = Box::new(BaselineTransport::new(timeout)?);

        let transport = Self::new(primary, secondary);
        Ok(match &config.rate_limit {
            Some(limit) => transport.with_rate_limit(limit),
            None => transport,
        })
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    #[instrument(skip(self, params))]
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let params = with_cache_buster(params);

        if let Some(primary) = &self.primary {
            self.throttle().await;
            match primary.fetch(url, &params).await {
                Ok(document) => return Ok(document),
                Err(e) if is_upstream_verdict(&e) => return Err(e),
                Err(e) => {
                    debug!(
                        strategy = primary.name(),
                        error = %e,
                        "Primary transport failed — falling back"
                    );
                }
            }
        }

        self.throttle().await;
        self.secondary.fetch(url, &params).await
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

fn is_upstream_verdict(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ScraperError>()
        .is_some_and(|e| e.kind().is_upstream())
}

/// Copy of `params` with the current epoch-millisecond timestamp appended.
pub fn with_cache_buster(params: &[(String, String)]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = params
        .iter()
        .filter(|(key, _)| key != CACHE_BUSTER_PARAM)
        .cloned()
        .collect();
    out.push((
        CACHE_BUSTER_PARAM.to_string(),
        chrono::Utc::now().timestamp_millis().to_string(),
    ));
    out
}

fn create_rate_limiter(config: &RateLimitConfig) -> Arc<Limiter> {
    let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.burst_size).unwrap_or(rps);

    let quota = Quota::per_second(rps).allow_burst(burst);
    Arc::new(RateLimiter::direct(quota))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted transport recording the params it was called with.
    struct Scripted {
        outcome: fn() -> Result<Value>,
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<Vec<(String, String)>>>>,
    }

    impl Scripted {
        fn new(outcome: fn() -> Result<Value>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let transport = Self {
                outcome,
                calls: calls.clone(),
                seen: Arc::new(Mutex::new(Vec::new())),
            };
            (transport, calls)
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn fetch(&self, _url: &str, params: &[(String, String)]) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(params.to_vec());
            (self.outcome)()
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn ok_doc() -> Result<Value> {
        Ok(serde_json::json!({"ok": true}))
    }

    fn network_down() -> Result<Value> {
        Err(ScraperError::new(ErrorKind::Transport, "Connection failed").into())
    }

    fn blocked() -> Result<Value> {
        Err(ScraperError::new(ErrorKind::Blocked, "Blocked (403) by upstream").into())
    }

    fn foreign() -> Result<Value> {
        Err(anyhow::anyhow!("tls backend missing"))
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let (primary, primary_calls) = Scripted::new(ok_doc);
        let (secondary, secondary_calls) = Scripted::new(ok_doc);
        let transport = FallbackTransport::new(Some(Box::new(primary)), Box::new(secondary));

        transport.fetch("http://x", &[]).await.unwrap();
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_on_transport_failure() {
        let (primary, _) = Scripted::new(network_down);
        let (secondary, secondary_calls) = Scripted::new(ok_doc);
        let transport = FallbackTransport::new(Some(Box::new(primary)), Box::new(secondary));

        let doc = transport.fetch("http://x", &[]).await.unwrap();
        assert_eq!(doc["ok"], true);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_on_foreign_failure() {
        let (primary, _) = Scripted::new(foreign);
        let (secondary, secondary_calls) = Scripted::new(ok_doc);
        let transport = FallbackTransport::new(Some(Box::new(primary)), Box::new(secondary));

        assert!(transport.fetch("http://x", &[]).await.is_ok());
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upstream_verdict_propagates() {
        let (primary, _) = Scripted::new(blocked);
        let (secondary, secondary_calls) = Scripted::new(ok_doc);
        let transport = FallbackTransport::new(Some(Box::new(primary)), Box::new(secondary));

        let err = transport.fetch("http://x", &[]).await.unwrap_err();
        let err = err.downcast::<ScraperError>().unwrap();
        assert_eq!(err.kind(), ErrorKind::Blocked);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_primary_uses_secondary() {
        let (secondary, secondary_calls) = Scripted::new(ok_doc);
        let transport = FallbackTransport::new(None, Box::new(secondary));

        assert!(transport.fetch("http://x", &[]).await.is_ok());
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_strategies_see_same_cache_buster() {
        let (primary, _) = Scripted::new(network_down);
        let primary_seen = primary.seen.clone();
        let (secondary, _) = Scripted::new(ok_doc);
        let secondary_seen = secondary.seen.clone();
        let transport = FallbackTransport::new(Some(Box::new(primary)), Box::new(secondary));

        let params = vec![("marketId".to_string(), "1,18,10".to_string())];
        transport.fetch("http://x", &params).await.unwrap();

        let first = primary_seen.lock().unwrap()[0].clone();
        let second = secondary_seen.lock().unwrap()[0].clone();
        assert_eq!(first, second);
        assert!(first.iter().any(|(k, _)| k == CACHE_BUSTER_PARAM));
        assert!(first.iter().any(|(k, v)| k == "marketId" && v == "1,18,10"));
    }

    #[test]
    fn test_cache_buster_replaces_existing() {
        let params = vec![(CACHE_BUSTER_PARAM.to_string(), "1".to_string())];
        let busted = with_cache_buster(&params);
        assert_eq!(busted.len(), 1);
        assert_ne!(busted[0].1, "1");
    }

    #[test]
    fn test_random_user_agent_from_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(&RateLimitConfig {
            requests_per_second: 2,
            burst_size: 4,
        });
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_clients_build() {
        assert!(BrowserTransport::new(Duration::from_secs(1)).is_ok());
        assert!(BaselineTransport::new(Duration::from_secs(1)).is_ok());
    }
}
