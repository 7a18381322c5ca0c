//! Events the router consumes and what it reports back.

use earcheo_classifier::{Classification, Policy};
use earcheo_protocol::{ControlMessage, Request, Response};
use earcheo_store::GcResult;
use serde::Serialize;

/// A host event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Message(ControlMessage),
}

/// Result of handling one [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Outcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    Message(MessageOutcome),
}

/// Where a returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseSource::Cache => f.write_str("cache"),
            ResponseSource::Network => f.write_str("network"),
        }
    }
}

/// What the router did with a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the fetch itself.
    Passthrough { classification: Classification },

    /// The router answered the fetch.
    Respond {
        response: Response,
        source: ResponseSource,
        policy: Policy,
    },

    /// Intercepted, but neither network nor cache produced a response.
    Unavailable { policy: Policy },
}

impl FetchOutcome {
    pub fn respond(response: Response, source: ResponseSource, policy: Policy) -> Self {
        Self::Respond {
            response,
            source,
            policy,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Respond { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, FetchOutcome::Passthrough { .. })
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Store the warm-up list went into.
    pub tag: String,
    /// Absolute URLs cached.
    pub cached: Vec<String>,
    /// Install skips the waiting phase.
    pub skip_waiting: bool,
}

/// Result of activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub gc: GcResult,
    pub clients_claimed: bool,
}

/// Result of a control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MessageOutcome {
    Cleared { gc: GcResult },
    Ignored,
}
