//! eArcheo cache router
//!
//! This crate implements the tile and asset cache router of the eArcheo map
//! client: every outgoing request is classified as a map tile (cache-first),
//! an application asset (network-first) or something to leave alone, and
//! cache generations are rotated through an install/activate lifecycle.

pub mod config;
pub mod explain;
pub mod fetch;
pub mod logging;
pub mod mock;
pub mod router;

pub use config::{EffectiveConfig, RouterConfig, Settings};
pub use earcheo_classifier::{Classification, Classifier, Policy, RouteTable};
pub use earcheo_protocol::{CacheKey, ControlMessage, FetchError, Request, Response};
pub use earcheo_store::{CacheStorage, DiskStorage, MemoryStorage, StoreError};
pub use fetch::{Fetcher, ReqwestFetcher};
pub use router::{CacheRouter, Event, FetchOutcome, Outcome, RouterError, WorkerState};
