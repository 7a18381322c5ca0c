//! The cache router
//!
//! One [`CacheRouter`] per worker generation. Every host event goes through
//! [`CacheRouter::handle`]; fetches are classified and routed to exactly one
//! policy:
//!
//! - `tile`: cache-first against the tile store ([`tile::cache_first`])
//! - `asset`: network-first with cache fallback ([`asset::network_first`])
//! - `ignore`: passed through untouched

pub mod asset;
mod error;
mod lifecycle;
mod outcome;
pub mod tile;

use earcheo_classifier::{Classification, Classifier, Policy};
use earcheo_protocol::{CacheKey, ControlMessage, Request};
use earcheo_store::{delete_all, delete_stale, CacheStorage};
use tracing::{debug, info, warn};

use crate::config::RouterConfig;
use crate::fetch::Fetcher;

pub use error::RouterError;
pub use lifecycle::{Lifecycle, LifecycleError, PendingTransition, WorkerState};
pub use outcome::{
    ActivateReport, Event, FetchOutcome, InstallReport, MessageOutcome, Outcome, ResponseSource,
};

/// Routes host events for one worker generation.
#[derive(Debug)]
pub struct CacheRouter<S, F> {
    config: RouterConfig,
    classifier: Classifier,
    storage: S,
    fetcher: F,
    lifecycle: Lifecycle,
}

impl<S: CacheStorage, F: Fetcher> CacheRouter<S, F> {
    /// A freshly registered worker; it must install and activate before it
    /// intercepts anything.
    pub fn new(config: RouterConfig, storage: S, fetcher: F) -> Result<Self, RouterError> {
        Self::with_state(config, storage, fetcher, WorkerState::Parsed)
    }

    /// A worker that already activated in an earlier run, as when the host
    /// restarts an idle worker.
    pub fn resume(config: RouterConfig, storage: S, fetcher: F) -> Result<Self, RouterError> {
        Self::with_state(config, storage, fetcher, WorkerState::Active)
    }

    /// A worker starting in `state`, for hosts that persist lifecycle
    /// progress between runs.
    pub fn with_state(
        config: RouterConfig,
        storage: S,
        fetcher: F,
        state: WorkerState,
    ) -> Result<Self, RouterError> {
        config.validate()?;
        let classifier = Classifier::new(config.page_origin()?, config.routes.clone());
        Ok(Self {
            config,
            classifier,
            storage,
            fetcher,
            lifecycle: Lifecycle::starting_at(state),
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    /// Classify a request URL without routing it.
    pub fn classify(&self, url: &str) -> Classification {
        self.classifier.classify(url)
    }

    /// Dispatch one host event.
    pub async fn handle(&self, event: Event) -> Result<Outcome, RouterError> {
        match event {
            Event::Install => self.install().await.map(Outcome::Installed),
            Event::Activate => self.activate().await.map(Outcome::Activated),
            Event::Fetch(request) => self.on_fetch(&request).await.map(Outcome::Fetched),
            Event::Message(message) => self.on_message(&message).await.map(Outcome::Message),
        }
    }

    /// Warm the asset store with the configured warm-up list.
    ///
    /// All URLs are fetched before anything is written, then stored as one
    /// batch. A single failure, non-2xx response or rejected write leaves the
    /// store untouched and the worker redundant, as does dropping the future.
    pub async fn install(&self) -> Result<InstallReport, RouterError> {
        let pending = self.lifecycle.begin(WorkerState::Installing, WorkerState::Redundant)?;

        match self.warm_up().await {
            Ok(report) => {
                pending.settle(WorkerState::Installed)?;
                info!(tag = %report.tag, urls = report.cached.len(), "[install] warm-up cached");
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "[install] failed, worker is redundant");
                pending.settle(WorkerState::Redundant)?;
                Err(e)
            }
        }
    }

    async fn warm_up(&self) -> Result<InstallReport, RouterError> {
        let tag = self.config.asset_version_tag.as_str();
        self.storage.open(tag).await?;

        let mut fetched = Vec::with_capacity(self.config.warmup.len());
        let mut cached = Vec::with_capacity(self.config.warmup.len());
        for path in &self.config.warmup {
            let request = Request::resolve(&self.config.origin, path).map_err(|e| RouterError::Install {
                url: path.clone(),
                reason: e.to_string(),
            })?;
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| RouterError::Install {
                    url: request.url.clone(),
                    reason: e.to_string(),
                })?;
            if !response.is_ok() {
                return Err(RouterError::Install {
                    url: request.url.clone(),
                    reason: format!("status {}", response.status),
                });
            }
            fetched.push((CacheKey::from_request(&request), response));
            cached.push(request.url);
        }

        self.storage.put_all(tag, &fetched).await?;

        Ok(InstallReport {
            tag: tag.to_string(),
            cached,
            skip_waiting: true,
        })
    }

    /// Delete stale generations and take control of clients.
    ///
    /// Stores that fail to delete are reported in the result and left for
    /// the next activation.
    pub async fn activate(&self) -> Result<ActivateReport, RouterError> {
        let pending = self.lifecycle.begin(WorkerState::Activating, WorkerState::Installed)?;

        let gc = match delete_stale(&self.storage, &self.config.current_tags()).await {
            Ok(gc) => gc,
            Err(e) => {
                warn!(error = %e, "[activate] could not enumerate stores");
                pending.settle(WorkerState::Installed)?;
                return Err(e.into());
            }
        };

        pending.settle(WorkerState::Active)?;
        info!(
            deleted = gc.deleted.len(),
            retained = gc.retained.len(),
            errors = gc.errors.len(),
            "[activate] worker active, clients claimed"
        );
        Ok(ActivateReport {
            gc,
            clients_claimed: true,
        })
    }

    /// Route one fetch.
    pub async fn on_fetch(&self, request: &Request) -> Result<FetchOutcome, RouterError> {
        let classification = self.classify(&request.url);
        debug!(
            url = %request.url,
            policy = %classification.policy,
            reason = %classification.reason.to_code(),
            "classified request"
        );

        let state = self.state();
        if !state.intercepts_fetches() {
            debug!(url = %request.url, state = %state, "worker not active, passing through");
            return Ok(FetchOutcome::Passthrough { classification });
        }

        match classification.policy {
            Policy::Tile => {
                tile::cache_first(&self.storage, &self.fetcher, &self.config.tile_version_tag, request).await
            }
            Policy::Asset => {
                asset::network_first(&self.storage, &self.fetcher, &self.config.asset_version_tag, request)
                    .await
            }
            Policy::Ignore => Ok(FetchOutcome::Passthrough { classification }),
        }
    }

    /// Handle a control message from a page.
    pub async fn on_message(&self, message: &ControlMessage) -> Result<MessageOutcome, RouterError> {
        match message {
            ControlMessage::ClearCache => {
                let state = self.state();
                if state.is_terminal() {
                    return Err(LifecycleError::Terminal(state).into());
                }
                let gc = delete_all(&self.storage).await?;
                info!(deleted = gc.deleted.len(), "[message] caches cleared");
                Ok(MessageOutcome::Cleared { gc })
            }
            ControlMessage::Unknown => {
                debug!("[message] ignoring unrecognized message");
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// A newer generation took over.
    pub fn supersede(&self) -> Result<(), RouterError> {
        self.lifecycle.transition(WorkerState::Superseded)?;
        Ok(())
    }

    pub fn terminate(&self) -> Result<(), RouterError> {
        self.lifecycle.transition(WorkerState::Terminated)?;
        Ok(())
    }
}
