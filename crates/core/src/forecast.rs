//! Point forecasts and hour-of-day labelling.

use serde::{Deserialize, Serialize};

/// The fixed hour-of-day labels attached to forecast entries, cycling every 24 steps.
pub const HOUR_LABELS: [&str; 24] = [
    "00:00", "01:00", "02:00", "03:00", "04:00", "05:00", "06:00", "07:00", "08:00", "09:00",
    "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00", "17:00", "18:00", "19:00",
    "20:00", "21:00", "22:00", "23:00",
];

/// Label for the `step`-th forecast entry (0-based).
pub fn hour_label(step: usize) -> &'static str {
    HOUR_LABELS[step % HOUR_LABELS.len()]
}

/// Bounds around a point estimate at a given coverage level (e.g. 0.95).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

/// A single forecast value for one future step.
///
/// Produced fresh on every forecast call; never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointForecast {
    pub value: f64,
    pub interval: Option<ConfidenceInterval>,
}

impl PointForecast {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            interval: None,
        }
    }

    pub fn with_interval(mut self, lower: f64, upper: f64, level: f64) -> Self {
        self.interval = Some(ConfidenceInterval {
            lower,
            upper,
            level,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn labels_start_at_midnight_and_wrap() {
        assert_eq!(hour_label(0), "00:00");
        assert_eq!(hour_label(23), "23:00");
        assert_eq!(hour_label(24), "00:00");
        assert_eq!(hour_label(71), "23:00");
    }

    proptest! {
        /// Property: labels cycle with period 24.
        #[test]
        fn labels_cycle_every_24_steps(step in 0usize..10_000) {
            prop_assert_eq!(hour_label(step), hour_label(step + 24));
            prop_assert_eq!(hour_label(step), HOUR_LABELS[step % 24]);
        }
    }
}
