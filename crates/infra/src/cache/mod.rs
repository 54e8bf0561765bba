//! Model cache: one trained model per signal, trained as a pair.
//!
//! State machine (per process):
//!
//! ```text
//! Uninitialized --access--> Training --ok--> Ready
//!                              |  ^            |
//!                         error|  |access      |invalidate_all
//!                              v  |            v
//!                             Failed      Uninitialized
//! ```
//!
//! - At most one training runs at a time; concurrent callers wait for it and
//!   observe its outcome (the same pair or the same failure).
//! - The ready pair is installed in one step after both fits succeed; readers
//!   never see a half-trained pair.
//! - Invalidation while training discards that training's result and trains again.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use meteocast_core::{DatasetSnapshot, Signal};
use meteocast_model::{ForecastModel, ModelError, ModelFitter};

use crate::dataset::DatasetSource;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("dataset unavailable: {0}")]
    Dataset(String),

    #[error("model training failed for {signal}: {source}")]
    ModelTrainingFailed {
        signal: Signal,
        #[source]
        source: ModelError,
    },

    #[error("training aborted: {0}")]
    Aborted(String),

    #[error("model cache lock poisoned")]
    Poisoned,
}

/// Observable readiness of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    Uninitialized,
    Training,
    Ready { epoch: u64 },
    Failed { reason: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }

    /// Epoch of the ready pair, if any.
    pub fn epoch(&self) -> Option<u64> {
        match self {
            Readiness::Ready { epoch } => Some(*epoch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::Uninitialized => "uninitialized",
            Readiness::Training => "training",
            Readiness::Ready { .. } => "ready",
            Readiness::Failed { .. } => "failed",
        }
    }
}

/// Both signal models, trained from the same dataset snapshot.
#[derive(Debug)]
pub struct ModelPair {
    epoch: u64,
    trained_at: DateTime<Utc>,
    rows: usize,
    temperature: Arc<dyn ForecastModel>,
    humidity: Arc<dyn ForecastModel>,
}

impl ModelPair {
    /// Invalidation epoch the pair was trained in.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Number of snapshot rows the pair was trained on.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn model(&self, signal: Signal) -> Arc<dyn ForecastModel> {
        match signal {
            Signal::Temperature => Arc::clone(&self.temperature),
            Signal::Humidity => Arc::clone(&self.humidity),
        }
    }
}

#[derive(Debug)]
enum Slot {
    Empty,
    Training { attempt: u64 },
    Ready(Arc<ModelPair>),
    Failed { attempt: u64, error: CacheError },
}

#[derive(Debug)]
struct CacheState {
    slot: Slot,
    /// Bumped by every `invalidate_all`.
    epoch: u64,
    attempts: u64,
}

impl CacheState {
    fn claim(&mut self) -> Claim {
        self.attempts += 1;
        self.slot = Slot::Training {
            attempt: self.attempts,
        };
        Claim {
            attempt: self.attempts,
            epoch: self.epoch,
        }
    }

    fn is_training(&self, attempt: u64) -> bool {
        matches!(self.slot, Slot::Training { attempt: a } if a == attempt)
    }
}

/// What to do after an attempt finished.
#[derive(Debug)]
enum Settled {
    Done(Result<Arc<ModelPair>, CacheError>),
    Retrain(Claim),
}

/// Right to run training attempt `attempt`, started in invalidation epoch `epoch`.
#[derive(Debug, Copy, Clone)]
struct Claim {
    attempt: u64,
    epoch: u64,
}

/// Get-or-train cache for the forecasting model pair.
pub struct ModelCache {
    source: Arc<dyn DatasetSource>,
    fitter: Arc<dyn ModelFitter>,
    state: Mutex<CacheState>,
    changed: Condvar,
}

impl core::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelCache")
            .field("source", &self.source.describe())
            .field("fitter", &self.fitter.name())
            .finish_non_exhaustive()
    }
}

impl ModelCache {
    /// Create an empty (uninitialized) cache.
    pub fn new(source: Arc<dyn DatasetSource>, fitter: Arc<dyn ModelFitter>) -> Self {
        Self {
            source,
            fitter,
            state: Mutex::new(CacheState {
                slot: Slot::Empty,
                epoch: 0,
                attempts: 0,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>, CacheError> {
        self.state.lock().map_err(|_| CacheError::Poisoned)
    }

    /// True iff both signal models are present.
    pub fn is_ready(&self) -> bool {
        self.lock()
            .map(|s| matches!(s.slot, Slot::Ready(_)))
            .unwrap_or(false)
    }

    pub fn readiness(&self) -> Readiness {
        let state = match self.lock() {
            Ok(s) => s,
            Err(e) => {
                return Readiness::Failed {
                    reason: e.to_string(),
                };
            }
        };
        match &state.slot {
            Slot::Empty => Readiness::Uninitialized,
            Slot::Training { .. } => Readiness::Training,
            Slot::Ready(pair) => Readiness::Ready { epoch: pair.epoch },
            Slot::Failed { error, .. } => Readiness::Failed {
                reason: error.to_string(),
            },
        }
    }

    /// The ready pair, without ever triggering training.
    pub fn ready_pair(&self) -> Option<Arc<ModelPair>> {
        match &self.lock().ok()?.slot {
            Slot::Ready(pair) => Some(Arc::clone(pair)),
            _ => None,
        }
    }

    /// Return the model for `signal`, training the pair first if needed.
    ///
    /// Blocks while a training is in flight.
    pub fn get_or_train(&self, signal: Signal) -> Result<Arc<dyn ForecastModel>, CacheError> {
        Ok(self.ensure_ready()?.model(signal))
    }

    /// Return the ready pair, training it first if needed.
    pub fn ensure_ready(&self) -> Result<Arc<ModelPair>, CacheError> {
        let mut state = self.lock()?;
        loop {
            if let Slot::Ready(pair) = &state.slot {
                return Ok(Arc::clone(pair));
            }

            if let Slot::Training { attempt } = state.slot {
                state = self
                    .changed
                    .wait_while(state, |s| s.is_training(attempt))
                    .map_err(|_| CacheError::Poisoned)?;
                if let Slot::Failed { attempt: failed, error } = &state.slot {
                    if *failed == attempt {
                        return Err(error.clone());
                    }
                }
                // Ready, or superseded by a newer attempt: re-evaluate.
                continue;
            }

            let claim = state.claim();
            drop(state);
            return self.drive(claim);
        }
    }

    /// Drop both models and start a new epoch. The next access retrains.
    ///
    /// Returns the new epoch.
    pub fn invalidate_all(&self) -> u64 {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.epoch += 1;
        if !matches!(state.slot, Slot::Training { .. }) {
            state.slot = Slot::Empty;
        }
        info!(epoch = state.epoch, "model cache invalidated");
        self.changed.notify_all();
        state.epoch
    }

    /// Start training on a background thread if nothing is trained or training.
    ///
    /// Returns the thread handle when a training was started.
    pub fn spawn_warmup(self: &Arc<Self>) -> Option<thread::JoinHandle<()>> {
        let claim = {
            let mut state = self.lock().ok()?;
            if matches!(state.slot, Slot::Training { .. } | Slot::Ready(_)) {
                return None;
            }
            state.claim()
        };

        let cache = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("meteocast-warmup".to_string())
            .spawn(move || {
                if let Err(e) = cache.drive(claim) {
                    warn!(error = %e, "background warm-up failed");
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(error = %e, "failed to spawn warm-up thread");
                let _ = self.finish(claim, Err(CacheError::Aborted(e.to_string())));
                None
            }
        }
    }

    /// Run claimed trainings until one completes in the current epoch.
    fn drive(&self, mut claim: Claim) -> Result<Arc<ModelPair>, CacheError> {
        loop {
            let guard = AbortOnUnwind {
                cache: self,
                claim,
            };
            let outcome = self.train(claim.epoch);
            std::mem::forget(guard);

            let mut state = self.lock()?;
            match self.settle(&mut state, claim, outcome) {
                Settled::Done(result) => return result,
                Settled::Retrain(next) => claim = next,
            }
        }
    }

    /// Decide the fate of a finished attempt. Runs under the state lock, so the
    /// epoch check and the slot write cannot be split by an invalidation.
    fn settle(
        &self,
        state: &mut CacheState,
        claim: Claim,
        outcome: Result<Arc<ModelPair>, CacheError>,
    ) -> Settled {
        if state.epoch != claim.epoch && state.is_training(claim.attempt) {
            warn!(
                attempt = claim.attempt,
                stale_epoch = claim.epoch,
                epoch = state.epoch,
                "cache invalidated during training; retraining"
            );
            let next = state.claim();
            self.changed.notify_all();
            return Settled::Retrain(next);
        }
        self.publish(state, claim, &outcome);
        Settled::Done(outcome)
    }

    /// Publish the outcome of `claim` and wake waiters.
    fn finish(
        &self,
        claim: Claim,
        outcome: Result<Arc<ModelPair>, CacheError>,
    ) -> Result<Arc<ModelPair>, CacheError> {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.publish(&mut state, claim, &outcome);
        outcome
    }

    fn publish(
        &self,
        state: &mut CacheState,
        claim: Claim,
        outcome: &Result<Arc<ModelPair>, CacheError>,
    ) {
        if state.is_training(claim.attempt) {
            state.slot = match outcome {
                Ok(pair) => Slot::Ready(Arc::clone(pair)),
                Err(error) => Slot::Failed {
                    attempt: claim.attempt,
                    error: error.clone(),
                },
            };
        }
        self.changed.notify_all();
    }

    /// Pull one snapshot and fit both signals from it.
    fn train(&self, epoch: u64) -> Result<Arc<ModelPair>, CacheError> {
        let started = Instant::now();
        info!(
            epoch,
            source = %self.source.describe(),
            fitter = self.fitter.name(),
            "model training started"
        );

        let snapshot = self.source.get().map_err(|e| {
            error!(epoch, error = %e, "failed to load dataset snapshot");
            CacheError::Dataset(e.to_string())
        })?;

        let temperature = self.fit_signal(&snapshot, Signal::Temperature)?;
        let humidity = self.fit_signal(&snapshot, Signal::Humidity)?;

        info!(
            epoch,
            rows = snapshot.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model training finished"
        );

        Ok(Arc::new(ModelPair {
            epoch,
            trained_at: Utc::now(),
            rows: snapshot.len(),
            temperature,
            humidity,
        }))
    }

    fn fit_signal(
        &self,
        snapshot: &DatasetSnapshot,
        signal: Signal,
    ) -> Result<Arc<dyn ForecastModel>, CacheError> {
        let started = Instant::now();
        let series = snapshot.series(signal);

        match self.fitter.fit(&series) {
            Ok(model) => {
                info!(
                    %signal,
                    model = %model.describe(),
                    observations = series.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "signal model fitted"
                );
                Ok(Arc::from(model))
            }
            Err(source) => {
                error!(%signal, error = %source, "signal model fit failed");
                Err(CacheError::ModelTrainingFailed { signal, source })
            }
        }
    }
}

/// Marks the claimed attempt as failed if the fitter panics, so waiters are released.
struct AbortOnUnwind<'a> {
    cache: &'a ModelCache,
    claim: Claim,
}

impl Drop for AbortOnUnwind<'_> {
    fn drop(&mut self) {
        let _ = self.cache.finish(
            self.claim,
            Err(CacheError::Aborted("training panicked".to_string())),
        );
    }
}
