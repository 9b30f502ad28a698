use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The two interchangeable payment processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorIdentity {
    Default,
    Fallback,
}

impl ProcessorIdentity {
    /// Preference order used by dispatch.
    pub const ALL: [ProcessorIdentity; 2] = [ProcessorIdentity::Default, ProcessorIdentity::Fallback];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorIdentity::Default => "default",
            ProcessorIdentity::Fallback => "fallback",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ProcessorIdentity::Default => 0,
            ProcessorIdentity::Fallback => 1,
        }
    }
}

impl fmt::Display for ProcessorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown processor '{0}'")]
pub struct UnknownProcessor(pub String);

impl FromStr for ProcessorIdentity {
    type Err = UnknownProcessor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(ProcessorIdentity::Default),
            "fallback" => Ok(ProcessorIdentity::Fallback),
            other => Err(UnknownProcessor(other.to_string())),
        }
    }
}

/// Cached health of one processor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorStatus {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub failing: bool,
    pub min_response_time_ms: u64,
    pub last_update: DateTime<Utc>,
}

impl ProcessorStatus {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            failing: false,
            min_response_time_ms: 0,
            last_update: Utc::now(),
        }
    }
}

/// Row of the persisted `cache` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub processor: ProcessorIdentity,
    pub failing: bool,
    pub min_response_time_ms: u64,
    pub last_update: DateTime<Utc>,
}

/// Body of `GET /payments/service-health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub failing: bool,
    pub min_response_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips_through_its_name() {
        for identity in ProcessorIdentity::ALL {
            assert_eq!(identity.as_str().parse::<ProcessorIdentity>(), Ok(identity));
        }
        let err = "backup".parse::<ProcessorIdentity>().unwrap_err();
        assert_eq!(err.to_string(), "unknown processor 'backup'");
    }

    #[test]
    fn default_is_preferred() {
        assert_eq!(ProcessorIdentity::ALL[0], ProcessorIdentity::Default);
    }

    #[test]
    fn service_health_parses_processor_body() {
        let health: ServiceHealth =
            serde_json::from_str(r#"{"failing":true,"minResponseTime":120}"#).unwrap();
        assert!(health.failing);
        assert_eq!(health.min_response_time, 120);
    }
}
