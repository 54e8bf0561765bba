//! Measured quantities that are forecast.

use serde::{Deserialize, Serialize};

/// One of the two series the service trains and forecasts.
///
/// Models are trained per signal but served as a pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Temperature,
    Humidity,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Temperature => "temperature",
            Signal::Humidity => "humidity",
        }
    }
}

impl core::fmt::Display for Signal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
