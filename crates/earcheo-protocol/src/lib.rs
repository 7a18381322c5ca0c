//! eArcheo cache protocol types
//!
//! Defines what flows between the page, the cache router and the network:
//! requests, responses, cache keys and control messages.

pub mod error;
pub mod key;
pub mod message;
pub mod request;
pub mod response;

pub use error::{ErrorCode, FetchError};
pub use key::CacheKey;
pub use message::ControlMessage;
pub use request::Request;
pub use response::Response;

/// Message type that triggers a full cache clear.
pub const CLEAR_CACHE: &str = "CLEAR_CACHE";

/// The only HTTP method whose responses may be stored.
pub const CACHEABLE_METHOD: &str = "GET";
