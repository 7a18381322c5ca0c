//! Test doubles for the router
//!
//! - [`MockNetwork`]: a scripted network that counts fetches per URL
//! - [`FlakyStorage`]: wraps any cache storage and fails chosen operations
//!
//! Both are in-process and used by the unit and integration tests.

mod failure;
mod network;
mod storage;

pub use failure::{FailureConfig, FailureInjector, StoreOp};
pub use network::MockNetwork;
pub use storage::FlakyStorage;
