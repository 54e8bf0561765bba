//! Request tokens and supported forecast horizons.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Token that bypasses modeling and answers a static liveness payload.
pub const LIVENESS_TOKEN: &str = "ok";

/// Supported forecast horizons (number of hourly steps ahead).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    Day,
    TwoDays,
    ThreeDays,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Day, Horizon::TwoDays, Horizon::ThreeDays];

    /// Number of forecast steps.
    pub fn steps(&self) -> usize {
        match self {
            Horizon::Day => 24,
            Horizon::TwoDays => 48,
            Horizon::ThreeDays => 72,
        }
    }

    /// The literal token that selects this horizon.
    pub fn token(&self) -> &'static str {
        match self {
            Horizon::Day => "24",
            Horizon::TwoDays => "48",
            Horizon::ThreeDays => "72",
        }
    }
}

/// A validated forecast request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ForecastRequest {
    Liveness,
    Forecast(Horizon),
}

impl ForecastRequest {
    /// Validate a raw token.
    ///
    /// Matching is exact: no trimming, no case folding, no numeric parsing
    /// (`"024"` and `" 24"` are rejected).
    pub fn parse(token: &str) -> DomainResult<Self> {
        if token == LIVENESS_TOKEN {
            return Ok(Self::Liveness);
        }

        Horizon::ALL
            .into_iter()
            .find(|h| h.token() == token)
            .map(Self::Forecast)
            .ok_or_else(|| DomainError::unsupported(token))
    }
}

impl FromStr for ForecastRequest {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
