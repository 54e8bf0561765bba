//! Process configuration from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

/// Which estimator trains the signal models.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FitterKind {
    AutoArima,
    Naive,
}

impl FromStr for FitterKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto_arima" | "arima" => Ok(FitterKind::AutoArima),
            "naive" => Ok(FitterKind::Naive),
            other => bail!("unknown fitter {other:?} (expected auto_arima or naive)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub dataset_path: PathBuf,
    /// Used instead of `dataset_path` when the `postgres` feature is enabled.
    pub database_url: Option<String>,
    pub dataset_table: String,
    pub fitter: FitterKind,
    pub warm_on_startup: bool,
    /// `None` disables the retrain runner.
    pub retrain_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            dataset_path: PathBuf::from("data.csv"),
            database_url: None,
            dataset_table: "observations".to_string(),
            fitter: FitterKind::AutoArima,
            warm_on_startup: true,
            retrain_interval: None,
        }
    }
}

impl Config {
    /// Read the process environment (call `dotenvy::dotenv()` first to honour `.env`).
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got {v:?}"))?,
            None => defaults.port,
        };

        let fitter = match get("MODEL_FITTER") {
            Some(v) => v.parse().context("invalid MODEL_FITTER")?,
            None => defaults.fitter,
        };

        let warm_on_startup = match get("WARM_ON_STARTUP") {
            Some(v) => parse_bool(&v).with_context(|| format!("invalid WARM_ON_STARTUP {v:?}"))?,
            None => defaults.warm_on_startup,
        };

        let retrain_interval = match get("RETRAIN_INTERVAL_SECS") {
            Some(v) => {
                let secs = v
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("RETRAIN_INTERVAL_SECS must be whole seconds, got {v:?}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => defaults.retrain_interval,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            dataset_path: get("DATASET_PATH").map(PathBuf::from).unwrap_or(defaults.dataset_path),
            database_url: get("DATABASE_URL"),
            dataset_table: get("DATASET_TABLE").unwrap_or(defaults.dataset_table),
            fitter,
            warm_on_startup,
            retrain_interval,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("expected a boolean"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn reads_every_variable() {
        let cfg = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("DATASET_PATH", "/srv/merged.json"),
            ("DATABASE_URL", "postgres://localhost/weather"),
            ("DATASET_TABLE", "merged_hourly"),
            ("MODEL_FITTER", "naive"),
            ("WARM_ON_STARTUP", "false"),
            ("RETRAIN_INTERVAL_SECS", "3600"),
        ]))
        .unwrap();

        assert_eq!(cfg.bind_addr(), "127.0.0.1:9000");
        assert_eq!(cfg.dataset_path, PathBuf::from("/srv/merged.json"));
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/weather"));
        assert_eq!(cfg.dataset_table, "merged_hourly");
        assert_eq!(cfg.fitter, FitterKind::Naive);
        assert!(!cfg.warm_on_startup);
        assert_eq!(cfg.retrain_interval, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn zero_interval_disables_retraining() {
        let cfg = Config::from_lookup(lookup(&[("RETRAIN_INTERVAL_SECS", "0")])).unwrap();
        assert_eq!(cfg.retrain_interval, None);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(format!("{err:#}").contains("PORT"));

        let err = Config::from_lookup(lookup(&[("MODEL_FITTER", "prophet")])).unwrap_err();
        assert!(format!("{err:#}").contains("MODEL_FITTER"));

        let err = Config::from_lookup(lookup(&[("WARM_ON_STARTUP", "maybe")])).unwrap_err();
        assert!(format!("{err:#}").contains("WARM_ON_STARTUP"));
    }
}
