//! Scale readings
//!
//! The decoded domain value handed from the poll loop to consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale status as seen by consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleStatus {
    /// Stable weight available
    Ok,
    /// Scale is in motion, weight not settled
    Moving,
    /// Scale reported a fault
    Error,
    /// Link lost, last known weight retained
    Stale,
    /// No link to the scale
    Disconnected,
}

impl ScaleStatus {
    /// Lowercase name used in status reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleStatus::Ok => "ok",
            ScaleStatus::Moving => "moving",
            ScaleStatus::Error => "error",
            ScaleStatus::Stale => "stale",
            ScaleStatus::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ScaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One complete reading.
///
/// Readings are replaced wholesale in the store, never edited in place, so a
/// consumer always sees `value` and `status` from the same poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Weight in the scale's configured unit, if one has been received
    pub value: Option<f64>,
    /// Scale status
    pub status: ScaleStatus,
    /// When this reading was produced
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Reading held before the first poll cycle completes
    pub fn initial() -> Self {
        Self::disconnected()
    }

    /// Reading published while no link to the scale exists
    pub fn disconnected() -> Self {
        Self {
            value: None,
            status: ScaleStatus::Disconnected,
            timestamp: Utc::now(),
        }
    }

    /// Keep the last known weight but mark it as stale
    pub fn stale_from(prior: &Reading) -> Self {
        Self {
            value: prior.value,
            status: ScaleStatus::Stale,
            timestamp: Utc::now(),
        }
    }

    /// Copy of this reading with a fresh timestamp
    pub fn refreshed(mut self) -> Self {
        self.timestamp = Utc::now();
        self
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_reading() {
        let reading = Reading::initial();
        assert_eq!(reading.value, None);
        assert_eq!(reading.status, ScaleStatus::Disconnected);
    }

    #[test]
    fn test_stale_keeps_value() {
        let prior = Reading {
            value: Some(4.25),
            status: ScaleStatus::Ok,
            timestamp: Utc::now(),
        };
        let stale = Reading::stale_from(&prior);
        assert_eq!(stale.value, Some(4.25));
        assert_eq!(stale.status, ScaleStatus::Stale);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ScaleStatus::Moving).unwrap();
        assert_eq!(json, "\"moving\"");
        assert_eq!(ScaleStatus::Disconnected.to_string(), "disconnected");
    }
}
