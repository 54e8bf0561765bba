use std::io;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::cache::ModelCache;

/// Config for the retrain runner.
#[derive(Debug, Clone)]
pub struct RetrainRunner {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetrainRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

impl RetrainRunner {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Spawn the runner thread.
    ///
    /// - Schedule: invalidates and retrains every `interval`
    /// - Trigger: `handle.trigger()` requests a retrain now (coalesced)
    /// - Failures: retried with bounded exponential backoff, then dropped until the next tick
    pub fn spawn(&self, name: &'static str, cache: Arc<ModelCache>) -> io::Result<RetrainRunnerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        let cfg = self.clone();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || runner_loop(name, cfg, shutdown_rx, trigger_rx, cache))?;

        Ok(RetrainRunnerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        })
    }
}

/// Handle for the running retrain runner (shutdown + trigger hook).
#[derive(Debug)]
pub struct RetrainRunnerHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl RetrainRunnerHandle {
    /// Request a retrain, e.g. after the upstream merge job deposited new data.
    ///
    /// Triggers are coalesced: if one is already pending this is a no-op.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Stop the runner thread and wait for it.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

fn runner_loop(
    name: &'static str,
    cfg: RetrainRunner,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    cache: Arc<ModelCache>,
) {
    info!(runner = name, interval_secs = cfg.interval.as_secs(), "retrain runner started");

    let mut next_tick = Instant::now() + cfg.interval;
    let mut pending = false;
    // Retries reuse the current epoch instead of invalidating again.
    let mut retrying = false;
    let mut failures: u32 = 0;
    let mut backoff_until: Option<Instant> = None;

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let now = Instant::now();
        if now >= next_tick {
            pending = true;
            retrying = false;
            while next_tick <= now {
                next_tick += cfg.interval;
            }
        }

        while trigger_rx.try_recv().is_ok() {
            pending = true;
            retrying = false;
        }

        if let Some(until) = backoff_until {
            if Instant::now() < until {
                thread::sleep(Duration::from_millis(50));
                continue;
            }
            backoff_until = None;
        }

        if !pending {
            let sleep_for = next_tick
                .saturating_duration_since(Instant::now())
                .min(Duration::from_millis(250));
            thread::sleep(sleep_for);
            continue;
        }

        pending = false;

        if !retrying {
            cache.invalidate_all();
        }

        match cache.ensure_ready() {
            Ok(pair) => {
                failures = 0;
                retrying = false;
                info!(runner = name, epoch = pair.epoch(), rows = pair.rows(), "retrain finished");
            }
            Err(e) => {
                warn!(runner = name, error = %e, "retrain failed");
                failures += 1;
                if failures <= cfg.max_retries {
                    pending = true;
                    retrying = true;
                    backoff_until = Some(Instant::now() + backoff(cfg.base_backoff, failures));
                } else {
                    failures = 0;
                    retrying = false;
                }
            }
        }
    }

    info!(runner = name, "retrain runner stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // base * 2^(attempt-1), capped at 10s.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}
