//! Service wiring: dataset source, fitter, model cache and the forecast service.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use meteocast_core::{ForecastRequest, Horizon, PointForecast, Signal};
use meteocast_infra::{DatasetSource, FileDatasetSource, ModelCache, ModelPair, Readiness};
use meteocast_model::{AutoArimaFitter, ModelError, ModelFitter, NaiveFitter};

use crate::app::dto::{self, Envelope};
use crate::app::errors::ServiceError;
use crate::config::{Config, FitterKind};

/// Validates horizon tokens and answers them from the model cache.
///
/// Never trains on the request path: a cold cache yields the degraded
/// payload (optionally kicking off a background warm-up). After a failed
/// training, warm-ups are retried at most once per `retry_after`.
#[derive(Debug, Clone)]
pub struct ForecastService {
    cache: Arc<ModelCache>,
    warm_on_demand: bool,
    retry_after: Duration,
    last_warmup: Arc<Mutex<Option<Instant>>>,
}

const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

impl ForecastService {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self {
            cache,
            warm_on_demand: true,
            retry_after: DEFAULT_RETRY_AFTER,
            last_warmup: Arc::new(Mutex::new(None)),
        }
    }

    /// Minimum spacing of on-demand warm-ups once training has failed.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Whether a degraded response also starts a background training.
    pub fn with_warm_on_demand(mut self, enabled: bool) -> Self {
        self.warm_on_demand = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    pub fn handle(&self, token: &str) -> Result<Envelope, ServiceError> {
        let request = ForecastRequest::parse(token).map_err(|e| {
            warn!(token, error = %e, "unsupported prediction token");
            ServiceError::NotImplemented {
                token: token.to_string(),
            }
        })?;

        match request {
            ForecastRequest::Liveness => Ok(Envelope::liveness()),
            ForecastRequest::Forecast(horizon) => match self.cache.ready_pair() {
                Some(pair) => self.forecast(&pair, horizon),
                None => Err(self.not_ready(token)),
            },
        }
    }

    fn forecast(&self, pair: &ModelPair, horizon: Horizon) -> Result<Envelope, ServiceError> {
        let steps = horizon.steps();
        let temperature = forecast_signal(pair, Signal::Temperature, steps)?;
        let humidity = forecast_signal(pair, Signal::Humidity, steps)?;

        debug!(steps, epoch = pair.epoch(), "forecast served");
        Ok(Envelope::forecast(dto::shape_forecast(&temperature, &humidity)))
    }

    fn not_ready(&self, token: &str) -> ServiceError {
        let readiness = self.cache.readiness();
        if self.warm_on_demand {
            self.warm_up(token, &readiness);
        }

        match readiness {
            Readiness::Failed { reason } => ServiceError::ModelTrainingFailed {
                token: token.to_string(),
                reason,
            },
            _ => ServiceError::NotReady {
                token: token.to_string(),
            },
        }
    }
}

impl ForecastService {
    fn warm_up(&self, token: &str, readiness: &Readiness) {
        let Ok(mut last) = self.last_warmup.lock() else {
            return;
        };
        let now = Instant::now();
        let cooling = matches!(readiness, Readiness::Failed { .. })
            && last.is_some_and(|at| now.duration_since(at) < self.retry_after);
        if cooling {
            return;
        }
        if self.cache.spawn_warmup().is_some() {
            *last = Some(now);
            debug!(token, "cold cache; background warm-up started");
        }
    }
}

fn forecast_signal(
    pair: &ModelPair,
    signal: Signal,
    steps: usize,
) -> Result<Vec<PointForecast>, ServiceError> {
    let points = pair
        .model(signal)
        .forecast(steps)
        .map_err(|e: ModelError| {
            error!(%signal, steps, error = %e, "validated horizon refused by model");
            ServiceError::ForecastUnavailable(e.to_string())
        })?;

    if points.len() != steps {
        error!(%signal, steps, got = points.len(), "model returned wrong forecast length");
        return Err(ServiceError::ForecastUnavailable(format!(
            "{signal} model returned {} of {steps} steps",
            points.len()
        )));
    }
    Ok(points)
}

/// Everything the HTTP layer needs.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub forecast: ForecastService,
}

impl AppServices {
    pub fn new(forecast: ForecastService) -> Self {
        Self { forecast }
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        self.forecast.cache()
    }
}

pub fn build_fitter(kind: FitterKind) -> Arc<dyn ModelFitter> {
    match kind {
        FitterKind::AutoArima => Arc::new(AutoArimaFitter::new()),
        FitterKind::Naive => Arc::new(NaiveFitter::new()),
    }
}

/// Pick the dataset source from configuration.
pub async fn build_source(config: &Config) -> anyhow::Result<Arc<dyn DatasetSource>> {
    #[cfg(feature = "postgres")]
    if let Some(url) = &config.database_url {
        use anyhow::Context;

        let pool = sqlx::PgPool::connect(url)
            .await
            .context("failed to connect to DATABASE_URL")?;
        let handle = tokio::runtime::Handle::current();
        return Ok(Arc::new(
            meteocast_infra::PostgresDatasetSource::new(pool, handle)
                .with_table(config.dataset_table.clone()),
        ));
    }

    #[cfg(not(feature = "postgres"))]
    if config.database_url.is_some() {
        warn!("DATABASE_URL set but postgres feature not enabled; using DATASET_PATH");
    }

    Ok(Arc::new(FileDatasetSource::new(config.dataset_path.clone())))
}

/// Build the services for a process from configuration.
pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    let source = build_source(config).await?;
    let cache = Arc::new(ModelCache::new(source, build_fitter(config.fitter)));
    Ok(AppServices::new(ForecastService::new(cache)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use proptest::prelude::*;

    use meteocast_core::{Observation, ObservationSeries};
    use meteocast_infra::InMemoryDatasetSource;
    use meteocast_model::ForecastModel;

    use crate::app::dto::{PredictionData, ResponseStatus};

    /// Last-value stub that counts fits.
    #[derive(Default)]
    struct CountingFitter {
        fits: AtomicUsize,
        fail: bool,
    }

    impl CountingFitter {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    impl ModelFitter for CountingFitter {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn fit(&self, series: &ObservationSeries) -> Result<Box<dyn ForecastModel>, ModelError> {
            self.fits.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(20));
            if self.fail {
                return Err(ModelError::InvalidData {
                    signal: series.signal(),
                    reason: "fit refused".into(),
                });
            }
            NaiveFitter::new().fit(series)
        }
    }

    fn constant_cache(temperature: f64, humidity: f64) -> Arc<ModelCache> {
        let rows = (0..200).map(|_| Observation::new(temperature, humidity));
        Arc::new(ModelCache::new(
            Arc::new(InMemoryDatasetSource::new(rows)),
            Arc::new(NaiveFitter::new()),
        ))
    }

    fn cold_service() -> ForecastService {
        ForecastService::new(constant_cache(20.0, 60.0)).with_warm_on_demand(false)
    }

    fn warm_service(temperature: f64, humidity: f64) -> ForecastService {
        let cache = constant_cache(temperature, humidity);
        cache.ensure_ready().unwrap();
        ForecastService::new(cache)
    }

    fn entries(envelope: Envelope) -> Vec<dto::ForecastEntry> {
        match envelope.data {
            PredictionData::Forecast(entries) => entries,
            other => panic!("expected forecast data, got {other:?}"),
        }
    }

    #[test]
    fn liveness_is_ok_regardless_of_readiness() {
        let cold = cold_service();
        let env = cold.handle("ok").unwrap();
        assert_eq!(env.status, ResponseStatus::Ok);
        assert_eq!(env.data, PredictionData::Text("OK!".into()));
        assert!(!cold.cache().is_ready(), "liveness must not train");

        assert_eq!(warm_service(1.0, 2.0).handle("ok").unwrap(), Envelope::liveness());
    }

    #[test]
    fn cold_cache_returns_degraded_payload_echoing_token() {
        let svc = cold_service();
        for token in ["24", "48", "72"] {
            let err = svc.handle(token).unwrap_err();
            assert_eq!(err, ServiceError::NotReady { token: token.into() });
            let env = err.envelope();
            assert_eq!(env.status, ResponseStatus::BadRequest);
            assert_eq!(env.data, PredictionData::Text(token.into()));
            assert_eq!(env.msg, "Default");
        }
        assert!(!svc.cache().is_ready());
    }

    #[test]
    fn ready_cache_returns_one_entry_per_step() {
        let svc = warm_service(20.0, 60.0);
        for (token, steps) in [("24", 24), ("48", 48), ("72", 72)] {
            let list = entries(svc.handle(token).unwrap());
            assert_eq!(list.len(), steps);
            assert_eq!(list[0].hour, "00:00");
            assert_eq!(list[23].hour, "23:00");
            assert_eq!(list[steps - 1].hour, "23:00");
        }
    }

    #[test]
    fn constant_series_forecasts_the_constant() {
        let svc = warm_service(21.5, 64.0);
        let list = entries(svc.handle("24").unwrap());

        assert_eq!(list.len(), 24);
        for (i, e) in list.iter().enumerate() {
            assert_eq!(e.hour, format!("{i:02}:00"));
            assert_eq!(e.temperature, "21.5");
            assert_eq!(e.humidity, "64.0");
        }
    }

    #[test]
    fn consecutive_calls_reuse_the_cached_models() {
        let fitter = Arc::new(CountingFitter::default());
        let cache = Arc::new(ModelCache::new(
            Arc::new(InMemoryDatasetSource::new(
                (0..50).map(|i| Observation::new(i as f64, 50.0)),
            )),
            fitter.clone(),
        ));
        cache.ensure_ready().unwrap();
        let svc = ForecastService::new(cache);

        let first = svc.handle("24").unwrap();
        let second = svc.handle("24").unwrap();

        assert_eq!(first, second);
        assert_eq!(entries(first)[0].temperature, "49.0");
        // One fit per signal.
        assert_eq!(fitter.fits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn degraded_response_starts_background_warmup() {
        let svc = ForecastService::new(constant_cache(20.0, 60.0));
        assert!(svc.handle("24").is_err());

        let mut ready = false;
        for _ in 0..400 {
            if svc.cache().is_ready() {
                ready = true;
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(ready, "warm-up never finished");
        assert_eq!(entries(svc.handle("24").unwrap()).len(), 24);
    }

    #[test]
    fn failed_training_manifests_as_not_ready() {
        let cache = Arc::new(ModelCache::new(
            Arc::new(InMemoryDatasetSource::new(Vec::new())),
            Arc::new(NaiveFitter::new()),
        ));
        assert!(cache.ensure_ready().is_err());
        let svc = ForecastService::new(cache).with_warm_on_demand(false);

        let err = svc.handle("72").unwrap_err();
        assert!(matches!(err, ServiceError::ModelTrainingFailed { ref token, .. } if token == "72"));
        assert_eq!(err.envelope().data, PredictionData::Text("72".into()));
        assert_eq!(err.envelope().status, ResponseStatus::BadRequest);
    }

    #[test]
    fn concurrent_cold_requests_all_degrade_and_train_once() {
        const CALLERS: usize = 12;

        let fitter = Arc::new(CountingFitter::default());
        let cache = Arc::new(ModelCache::new(
            Arc::new(InMemoryDatasetSource::new(
                (0..200).map(|_| Observation::new(20.0, 60.0)),
            )),
            fitter.clone(),
        ));
        let svc = ForecastService::new(Arc::clone(&cache));
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|i| {
                let svc = svc.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let token = ["24", "48", "72"][i % 3];
                    (token, svc.handle(token))
                })
            })
            .collect();

        for h in handles {
            let (token, result) = h.join().unwrap();
            match result {
                Err(ServiceError::NotReady { token: echoed }) => assert_eq!(echoed, token),
                // A late caller may already see the finished pair.
                Ok(env) => assert_eq!(env.status, ResponseStatus::Ok),
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }

        let pair = cache.ensure_ready().unwrap();
        assert_eq!(pair.epoch(), 0);
        assert_eq!(fitter.fits.load(Ordering::SeqCst), 2);
    }

    fn wait_for_fits(fitter: &CountingFitter, fits: usize) {
        for _ in 0..400 {
            if fitter.fits.load(Ordering::SeqCst) >= fits {
                return;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        panic!("fitter never reached {fits} fits");
    }

    #[test]
    fn failed_cache_retries_warmup_at_most_once_per_interval() {
        let fitter = Arc::new(CountingFitter::failing());
        let cache = Arc::new(ModelCache::new(
            Arc::new(InMemoryDatasetSource::new(
                (0..50).map(|_| Observation::new(20.0, 60.0)),
            )),
            fitter.clone(),
        ));
        assert!(cache.ensure_ready().is_err());
        assert_eq!(fitter.fits.load(Ordering::SeqCst), 1);

        let svc = ForecastService::new(Arc::clone(&cache))
            .with_retry_after(Duration::from_secs(3600));
        assert!(matches!(svc.handle("24"), Err(ServiceError::ModelTrainingFailed { .. })));
        wait_for_fits(&fitter, 2);
        for _ in 0..100 {
            if matches!(cache.readiness(), Readiness::Failed { .. }) {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }

        for token in ["24", "48", "72", "24"] {
            assert!(matches!(svc.handle(token), Err(ServiceError::ModelTrainingFailed { .. })));
        }
        thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(fitter.fits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_cache_retries_again_once_the_interval_elapsed() {
        let fitter = Arc::new(CountingFitter::failing());
        let cache = Arc::new(ModelCache::new(
            Arc::new(InMemoryDatasetSource::new(
                (0..50).map(|_| Observation::new(20.0, 60.0)),
            )),
            fitter.clone(),
        ));
        assert!(cache.ensure_ready().is_err());

        let svc = ForecastService::new(Arc::clone(&cache)).with_retry_after(Duration::ZERO);
        assert!(svc.handle("24").is_err());
        wait_for_fits(&fitter, 2);
        for _ in 0..100 {
            if matches!(cache.readiness(), Readiness::Failed { .. }) {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(svc.handle("24").is_err());
        wait_for_fits(&fitter, 3);
    }

    proptest! {
        /// Property: every unsupported token is refused and echoed.
        #[test]
        fn unsupported_tokens_are_not_implemented(token in "\\PC{0,12}") {
            prop_assume!(!["24", "48", "72", "ok"].contains(&token.as_str()));
            let svc = cold_service();
            let err = svc.handle(&token).unwrap_err();
            prop_assert_eq!(&err, &ServiceError::NotImplemented { token: token.clone() });
            prop_assert_eq!(err.envelope().data, PredictionData::Text(token));
            prop_assert_eq!(err.envelope().status, ResponseStatus::NotImplemented);
        }
    }
}
