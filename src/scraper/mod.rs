//! Today's football matches from the SportyBet odds API.
//!
//! [`Scraper`] is the only entry point: it serves the shared cache when it
//! can and otherwise walks the endpoint chain until one endpoint yields
//! matches.

pub mod cache;
pub mod endpoints;
pub mod error;
pub mod fields;
pub mod models;
pub mod normalize;
pub mod parse;
pub mod transport;
pub mod validate;

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::ScraperConfig;
use crate::scraper::cache::MatchCache;
use crate::scraper::endpoints::{Endpoint, EndpointChain};
use crate::scraper::error::ScraperError;
use crate::scraper::models::Match;
use crate::scraper::transport::{FallbackTransport, Transport};

type Outcome = Result<Vec<Match>, ScraperError>;

/// Receiver for the outcome of the chain walk currently running, if any.
type InFlight = StdMutex<Option<watch::Receiver<Option<Outcome>>>>;

pub struct Scraper {
    chain: EndpointChain,
    transport: Arc<dyn Transport>,
    cache: MatchCache,
    /// Callers that miss while a walk is running wait for its outcome,
    /// success or failure, instead of starting their own.
    in_flight: InFlight,
}

/// Role of one caller in a refresh.
enum Flight<'a> {
    Lead(Landing<'a>),
    Follow(watch::Receiver<Option<Outcome>>),
}

/// Held by the caller walking the chain. Publishing the outcome (or being
/// dropped mid-walk) frees the slot for the next refresh.
struct Landing<'a> {
    slot: &'a InFlight,
    sender: watch::Sender<Option<Outcome>>,
    published: bool,
}

impl Landing<'_> {
    fn publish(mut self, outcome: &Outcome) {
        clear(self.slot);
        self.published = true;
        // No receivers left is fine; the leader still returns its own copy.
        let _ = self.sender.send(Some(outcome.clone()));
    }
}

impl Drop for Landing<'_> {
    fn drop(&mut self) {
        // After publishing, the slot may already belong to the next walk.
        if !self.published {
            clear(self.slot);
        }
    }
}

fn clear(slot: &InFlight) {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take();
}

impl Scraper {
    pub fn new(chain: EndpointChain, transport: Arc<dyn Transport>, cache: MatchCache) -> Self {
        Self {
            chain,
            transport,
            cache,
            in_flight: StdMutex::new(None),
        }
    }

    /// Default SportyBet chain over the dual-strategy transport.
    pub fn from_config(config: &ScraperConfig, cache: MatchCache) -> anyhow::Result<Self> {
        let chain = EndpointChain::sportybet(&config.base_url);
        let transport = FallbackTransport::from_config(config)?;
        Ok(Self::new(chain, Arc::new(transport), cache))
    }

    pub fn cache(&self) -> &MatchCache {
        &self.cache
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    /// Today's matches, from cache unless `force_refresh` or the cache is
    /// stale. Fails only when every endpoint failed or came back empty.
    ///
    /// Concurrent callers share one chain walk and all receive its outcome.
    /// A forced refresh also joins a walk already running.
    #[instrument(skip(self))]
    pub async fn get_today_matches(&self, force_refresh: bool) -> Result<Vec<Match>, ScraperError> {
        if !force_refresh {
            if let Some(matches) = self.cache.get().await {
                return Ok(matches);
            }
        }

        loop {
            match self.join_or_lead() {
                Flight::Lead(landing) => {
                    let outcome = self.refresh(force_refresh).await;
                    landing.publish(&outcome);
                    return outcome;
                }
                Flight::Follow(mut receiver) => {
                    debug!("Waiting on the refresh already in flight");
                    let landed = receiver
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|outcome| Option::clone(&outcome));
                    match landed {
                        Some(outcome) => return outcome,
                        None => debug!("Refresh abandoned before finishing, retrying"),
                    }
                }
            }
        }
    }

    fn join_or_lead(&self) -> Flight<'_> {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(receiver) = slot.as_ref() {
            return Flight::Follow(receiver.clone());
        }
        let (sender, receiver) = watch::channel(None);
        *slot = Some(receiver);
        Flight::Lead(Landing {
            slot: &self.in_flight,
            sender,
            published: false,
        })
    }

    async fn refresh(&self, force_refresh: bool) -> Outcome {
        // A walk that finished between our cache miss and taking the lead
        // has already refreshed the cache.
        if !force_refresh {
            if let Some(matches) = self.cache.get().await {
                debug!("Served by a refresh that just finished");
                return Ok(matches);
            }
        }
        self.walk_chain().await
    }

    async fn walk_chain(&self) -> Result<Vec<Match>, ScraperError> {
        let mut last_error: Option<ScraperError> = None;

        for endpoint in self.chain.iter() {
            info!(url = endpoint.url(), parser = endpoint.parser().name(), "Trying endpoint");

            match self.try_endpoint(endpoint).await {
                Ok(matches) if !matches.is_empty() => {
                    info!(url = endpoint.url(), matches = matches.len(), "Endpoint succeeded");
                    self.cache.set(matches.clone()).await;
                    return Ok(matches);
                }
                Ok(_) => {
                    warn!(url = endpoint.url(), "0 matches — trying next endpoint");
                }
                Err(e) => {
                    warn!(
                        url = endpoint.url(),
                        kind = %e.kind(),
                        error = %e,
                        "Endpoint failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.unwrap_or_else(ScraperError::exhausted);
        warn!(error = %error, endpoints = self.chain.len(), "Endpoint chain exhausted");
        Err(error)
    }

    async fn try_endpoint(&self, endpoint: &Endpoint) -> Result<Vec<Match>, ScraperError> {
        let document = self
            .transport
            .fetch(endpoint.url(), endpoint.params())
            .await
            .map_err(|e| match e.downcast::<ScraperError>() {
                Ok(scraper_error) => scraper_error,
                Err(other) => ScraperError::unexpected(endpoint.url(), other),
            })?;

        Ok(endpoint.parser().parse(&document))
    }
}
