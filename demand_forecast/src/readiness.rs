//! Readiness coordination for the background forecast
//!
//! The coordinator owns the only mutable forecast state in the process.
//! A single background worker publishes into it exactly once; any number of
//! readers take snapshots without waiting. Every published state is a
//! complete, immutable value behind an `Arc`, swapped in as a whole.

use crate::cache::FileCache;
use crate::error::Result;
use crate::forecast::ForecastResult;
use serde::Serialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Availability of the forecast
#[derive(Debug, Clone, PartialEq)]
pub enum ReadinessState {
    /// The background computation has not finished yet
    Computing,
    /// The forecast is available
    Ready(ForecastResult),
    /// The background computation failed with this message
    Error(String),
}

impl ReadinessState {
    pub fn status(&self) -> ReadinessStatus {
        match self {
            Self::Computing => ReadinessStatus::Computing,
            Self::Ready(_) => ReadinessStatus::Ready,
            Self::Error(_) => ReadinessStatus::Error,
        }
    }

    pub fn forecast(&self) -> Option<&ForecastResult> {
        match self {
            Self::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Whether the state is final for this coordinator
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Computing)
    }
}

/// Lightweight summary of [`ReadinessState`] for polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessStatus {
    Ready,
    Computing,
    Error,
}

impl ReadinessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Computing => "computing",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the forecast state and the background computation that fills it
#[derive(Debug)]
pub struct ReadinessCoordinator {
    state: watch::Sender<Arc<ReadinessState>>,
}

impl ReadinessCoordinator {
    /// Create a coordinator holding a fixed state, without background work
    pub fn with_state(state: ReadinessState) -> Self {
        let (state, _) = watch::channel(Arc::new(state));
        Self { state }
    }

    /// Start up from the file cache, or compute the forecast in the background.
    ///
    /// A cache hit makes the coordinator `Ready` immediately and `compute` is
    /// never called. Otherwise the coordinator starts `Computing` and a
    /// dedicated worker thread runs `compute`, publishes the outcome and
    /// writes a successful forecast through to the cache.
    pub fn start<F>(cache: FileCache, compute: F) -> Arc<Self>
    where
        F: FnOnce() -> Result<ForecastResult> + Send + 'static,
    {
        if let Some(cached) = cache.load() {
            info!("Serving cached forecast; background computation skipped");
            return Arc::new(Self::with_state(ReadinessState::Ready(cached)));
        }

        let coordinator = Arc::new(Self::with_state(ReadinessState::Computing));
        let worker = Arc::clone(&coordinator);

        let spawned = thread::Builder::new()
            .name("forecast-worker".to_string())
            .spawn(move || worker.run(cache, compute));

        if let Err(e) = spawned {
            error!(error = %e, "Failed to start forecast worker");
            coordinator.publish(ReadinessState::Error(format!(
                "Failed to start forecast computation: {}",
                e
            )));
        }

        coordinator
    }

    fn run<F>(&self, cache: FileCache, compute: F)
    where
        F: FnOnce() -> Result<ForecastResult>,
    {
        info!("Computing forecast in background");

        let outcome = match panic::catch_unwind(AssertUnwindSafe(compute)) {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Forecast computation panicked");
                self.publish(ReadinessState::Error(
                    "Forecast computation panicked".to_string(),
                ));
                return;
            }
        };

        match outcome {
            Ok(result) => {
                let published = self.publish(ReadinessState::Ready(result));
                info!("Forecast ready");

                if let Some(result) = published.forecast() {
                    if let Err(e) = cache.save(result) {
                        warn!(error = %e, "Forecast kept in memory only");
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Background forecast computation failed");
                self.publish(ReadinessState::Error(e.to_string()));
            }
        }
    }

    /// Replace a `Computing` state with `next`; settled states never change.
    fn publish(&self, next: ReadinessState) -> Arc<ReadinessState> {
        let next = Arc::new(next);
        let replaced = self.state.send_if_modified(|current| {
            if current.is_settled() {
                return false;
            }
            *current = Arc::clone(&next);
            true
        });

        if !replaced {
            warn!(status = %next.status(), "Readiness already settled; update ignored");
        }
        next
    }

    /// Snapshot of the current state; never waits on the computation
    pub fn state(&self) -> Arc<ReadinessState> {
        Arc::clone(&self.state.borrow())
    }

    /// Current status; never waits on the computation
    pub fn status(&self) -> ReadinessStatus {
        self.state.borrow().status()
    }

    /// Receiver notified whenever the state changes
    pub fn subscribe(&self) -> watch::Receiver<Arc<ReadinessState>> {
        self.state.subscribe()
    }

    /// Wait until the state is `Ready` or `Error`.
    ///
    /// For startup logging and tests; request handlers use [`Self::state`].
    pub async fn settled(&self) -> Arc<ReadinessState> {
        let mut receiver = self.subscribe();
        let settled = receiver
            .wait_for(|state| state.is_settled())
            .await
            .map(|state| Arc::clone(&state));
        settled.unwrap_or_else(|_| self.state())
    }
}
