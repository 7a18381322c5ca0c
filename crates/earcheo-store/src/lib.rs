//! Version-tagged response stores
//!
//! A store is a named generation of request → response entries. The router
//! keeps one store per version tag and garbage-collects generations whose
//! tag is no longer current.
//!
//! ## Implementations
//!
//! - [`MemoryStorage`]: process-local, used by tests and embedders
//! - [`DiskStorage`]: one directory per store, one JSON document per entry
//!
//! ## Atomicity
//!
//! Every operation is atomic at single-entry granularity. Concurrent writers
//! to the same key race harmlessly: the last completed write wins. A write
//! whose future is dropped part-way never leaves a partial entry behind.

mod disk;
mod gc;
mod memory;
mod storage;

pub use disk::DiskStorage;
pub use gc::{delete_all, delete_stale, GcResult};
pub use memory::MemoryStorage;
pub use storage::{CacheStorage, StoreError, StoreResult, StoreStats, StoredEntry};
