//! Worker lifecycle state machine
//!
//! States: PARSED → INSTALLING → INSTALLED → ACTIVATING → ACTIVE → SUPERSEDED → TERMINATED
//! with REDUNDANT when install fails

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    /// Registered, nothing run yet
    Parsed,
    /// Warm-up in progress
    Installing,
    /// Warm-up complete, waiting to activate
    Installed,
    /// Old generations being collected
    Activating,
    /// Controlling clients and intercepting fetches
    Active,
    /// A newer worker has taken over
    Superseded,
    /// Stopped by the host
    Terminated,
    /// Install failed; the worker will never run
    Redundant,
}

impl WorkerState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: WorkerState) -> bool {
        use WorkerState::*;
        match (self, target) {
            (Parsed, Installing) => true,

            (Installing, Installed) => true,
            (Installing, Redundant) => true,

            (Installed, Activating) => true,

            (Activating, Active) => true,
            // Activation could not enumerate stores; try again later
            (Activating, Installed) => true,

            (Active, Superseded) => true,

            (Parsed | Installed | Active | Superseded, Terminated) => true,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Terminated | WorkerState::Redundant)
    }

    /// Whether fetches are routed through the cache policies.
    pub fn intercepts_fetches(&self) -> bool {
        *self == WorkerState::Active
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Parsed => "PARSED",
            WorkerState::Installing => "INSTALLING",
            WorkerState::Installed => "INSTALLED",
            WorkerState::Activating => "ACTIVATING",
            WorkerState::Active => "ACTIVE",
            WorkerState::Superseded => "SUPERSEDED",
            WorkerState::Terminated => "TERMINATED",
            WorkerState::Redundant => "REDUNDANT",
        };
        f.write_str(name)
    }
}

/// Errors for lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid worker state transition from {from} to {to}")]
    InvalidTransition { from: WorkerState, to: WorkerState },

    #[error("worker is in terminal state {0}")]
    Terminal(WorkerState),
}

/// Shared, thread-safe lifecycle state.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<WorkerState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::starting_at(WorkerState::Parsed)
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(state: WorkerState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.lock()
    }

    /// Move to `to`, returning the previous state.
    pub fn transition(&self, to: WorkerState) -> Result<WorkerState, LifecycleError> {
        let mut state = self.lock();
        let from = *state;
        if !from.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition { from, to });
        }
        *state = to;
        Ok(from)
    }

    /// Enter the in-progress state `to` for an event that awaits.
    ///
    /// If the returned guard is dropped without being settled (the event's
    /// future was cancelled or panicked) the state moves to `on_cancel`.
    pub fn begin(&self, to: WorkerState, on_cancel: WorkerState) -> Result<PendingTransition<'_>, LifecycleError> {
        self.transition(to)?;
        Ok(PendingTransition {
            lifecycle: self,
            pending: to,
            on_cancel,
            settled: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, WorkerState> {
        // The state is a plain Copy value; a poisoned lock still holds a valid one.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// An in-progress lifecycle event, see [`Lifecycle::begin`].
#[derive(Debug)]
pub struct PendingTransition<'a> {
    lifecycle: &'a Lifecycle,
    pending: WorkerState,
    on_cancel: WorkerState,
    settled: bool,
}

impl PendingTransition<'_> {
    /// Finish the event by moving to `to`.
    pub fn settle(mut self, to: WorkerState) -> Result<WorkerState, LifecycleError> {
        self.settled = true;
        self.lifecycle.transition(to)
    }
}

impl Drop for PendingTransition<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.lifecycle.lock();
        // Someone else moved on (e.g. terminate); leave their state alone
        if *state == self.pending {
            warn!(from = %self.pending, to = %self.on_cancel, "lifecycle event abandoned");
            *state = self.on_cancel;
        }
    }
}
