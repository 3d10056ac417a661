//! Heartbeat samples and the severity model used to classify monitors.
//!
//! Severity is totally ordered `KO < Warn < OK`; aggregation keeps the
//! minimum, so the worst state seen always wins.

mod classify;
mod policy;

pub use classify::*;
pub use policy::*;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;

/// Raised when the dashboard reports a status code we do not know.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown heartbeat status code: {0}")]
pub struct UnknownStatus(pub u8);

/// Severity of a single heartbeat, or of a classified monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub enum HeartbeatStatus {
    KO,
    Warn,
    OK,
}

impl HeartbeatStatus {
    /// The worse of two severities.
    pub fn worst(self, other: HeartbeatStatus) -> HeartbeatStatus {
        self.min(other)
    }

    pub fn is_down(self) -> bool {
        matches!(self, HeartbeatStatus::KO | HeartbeatStatus::Warn)
    }
}

impl TryFrom<u8> for HeartbeatStatus {
    type Error = UnknownStatus;

    /// Dashboard codes: 0 down, 1 up, 2 pending, 3 maintenance.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HeartbeatStatus::KO),
            1 => Ok(HeartbeatStatus::OK),
            2 | 3 => Ok(HeartbeatStatus::Warn),
            other => Err(UnknownStatus(other)),
        }
    }
}

impl fmt::Display for HeartbeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HeartbeatStatus::KO => "KO",
            HeartbeatStatus::Warn => "WARN",
            HeartbeatStatus::OK => "OK",
        };
        f.write_str(s)
    }
}

/// Display state of a monitor after classification.
///
/// `WarnOk` is an `OK` monitor that still has a warning in its recent
/// window. It only changes how the monitor is drawn; for filtering and
/// rollups it counts as `OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalState {
    KO,
    Warn,
    OK,
    WarnOk,
}

impl LocalState {
    pub fn severity(self) -> HeartbeatStatus {
        match self {
            LocalState::KO => HeartbeatStatus::KO,
            LocalState::Warn => HeartbeatStatus::Warn,
            LocalState::OK | LocalState::WarnOk => HeartbeatStatus::OK,
        }
    }
}

impl From<HeartbeatStatus> for LocalState {
    fn from(status: HeartbeatStatus) -> Self {
        match status {
            HeartbeatStatus::KO => LocalState::KO,
            HeartbeatStatus::Warn => LocalState::Warn,
            HeartbeatStatus::OK => LocalState::OK,
        }
    }
}

/// Which severities survive a filter (visibility or notification).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFilter {
    pub ok: bool,
    pub warn: bool,
    pub ko: bool,
}

impl Default for StatusFilter {
    /// Problems only.
    fn default() -> Self {
        Self {
            ok: false,
            warn: true,
            ko: true,
        }
    }
}

impl StatusFilter {
    pub const ALL: StatusFilter = StatusFilter {
        ok: true,
        warn: true,
        ko: true,
    };

    /// Parse keywords `ok`, `warn`, `ko` and `all`, case-insensitively.
    ///
    /// Returns the first unknown keyword on failure.
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Result<Self, String> {
        let mut filter = StatusFilter {
            ok: false,
            warn: false,
            ko: false,
        };
        for keyword in keywords {
            match keyword.as_ref().trim().to_ascii_lowercase().as_str() {
                "all" => filter = Self::ALL,
                "ok" => filter.ok = true,
                "warn" => filter.warn = true,
                "ko" => filter.ko = true,
                "" => {}
                _ => return Err(keyword.as_ref().to_string()),
            }
        }
        Ok(filter)
    }

    pub fn keeps(&self, status: HeartbeatStatus) -> bool {
        match status {
            HeartbeatStatus::OK => self.ok,
            HeartbeatStatus::Warn => self.warn,
            HeartbeatStatus::KO => self.ko,
        }
    }

    pub fn keeps_state(&self, state: LocalState) -> bool {
        self.keeps(state.severity())
    }
}

/// One reported health point for a monitor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeartbeatSample {
    pub status: HeartbeatStatus,
    #[serde(rename = "time", deserialize_with = "deserialize_kuma_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "msg", default)]
    pub message: String,
    /// Round-trip latency in milliseconds, absent for failed checks.
    #[serde(rename = "ping", default)]
    pub latency: Option<f64>,
}

#[cfg(test)]
impl HeartbeatSample {
    pub fn new(status: HeartbeatStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            status,
            timestamp,
            message: String::new(),
            latency: None,
        }
    }
}

/// Parse a heartbeat timestamp as emitted by the dashboard (UTC).
pub fn parse_kuma_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [
        "%Y-%m-%d %H:%M:%S%.3f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}

fn deserialize_kuma_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_kuma_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid heartbeat time: {}", raw)))
}

#[cfg(test)]
pub(crate) fn samples(statuses: &[HeartbeatStatus]) -> Vec<HeartbeatSample> {
    use chrono::TimeZone;

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    statuses
        .iter()
        .enumerate()
        .map(|(i, s)| HeartbeatSample::new(*s, start + chrono::Duration::minutes(i as i64)))
        .collect()
}
