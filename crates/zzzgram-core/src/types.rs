//! Shared types for zzzgram-core.
//!
//! Field names follow the vendor's camelCase so the envelope serializes the
//! same way downstream consumers already read it.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

// ─────────────────────────────────────────────────────────────────────────────
// Telemetry
// ─────────────────────────────────────────────────────────────────────────────

/// Daily sleep summary as the vendor sends it. Durations are in seconds.
///
/// Absent and `null` fields both read as zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSleepSummary {
    #[serde(default)]
    pub naps: Option<u32>,
    #[serde(default)]
    pub longest_sleep: Option<f64>,
    #[serde(default)]
    pub total_sleep: Option<f64>,
    #[serde(default)]
    pub day_sleep: Option<f64>,
    #[serde(default)]
    pub night_sleep: Option<f64>,
    #[serde(default)]
    pub night_wakings: Option<u32>,
}

/// Canonical sleep metrics. Durations are minutes rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepMetrics {
    pub naps: u32,
    pub longest_sleep: f64,
    pub total_sleep: f64,
    pub day_sleep: f64,
    pub night_sleep: f64,
    pub night_wakings: u32,
}

impl SleepMetrics {
    /// Normalize a vendor summary. This is the only place seconds become minutes.
    pub fn from_raw(raw: &RawSleepSummary) -> Result<Self, FetchError> {
        Ok(Self {
            naps: raw.naps.unwrap_or(0),
            longest_sleep: seconds_to_minutes("longestSleep", raw.longest_sleep)?,
            total_sleep: seconds_to_minutes("totalSleep", raw.total_sleep)?,
            day_sleep: seconds_to_minutes("daySleep", raw.day_sleep)?,
            night_sleep: seconds_to_minutes("nightSleep", raw.night_sleep)?,
            night_wakings: raw.night_wakings.unwrap_or(0),
        })
    }
}

/// `round(seconds / 60, 1)` on the exact binary value, ties to even.
///
/// Fixed-precision float formatting rounds the exact value half-to-even, so
/// `0.25` becomes `0.2` and `120.05` (stored just below) becomes `120.0`.
pub fn minutes_from_seconds(seconds: f64) -> f64 {
    let minutes = seconds / 60.0;
    format!("{:.1}", minutes).parse().unwrap_or(minutes)
}

fn seconds_to_minutes(field: &str, seconds: Option<f64>) -> Result<f64, FetchError> {
    let seconds = seconds.unwrap_or(0.0);
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(FetchError::Malformed(format!(
            "{} must be a non-negative number of seconds, got {}",
            field, seconds
        )));
    }
    Ok(minutes_from_seconds(seconds))
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Tokens from the two-stage login. Lives for exactly one run.
#[derive(Clone)]
pub struct SessionCredentials {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: String,
    pub vendor_token: String,
}

impl SessionCredentials {
    /// Bearer token for telemetry calls (the identity token, not the vendor token).
    pub fn bearer(&self) -> &str {
        &self.id_token
    }
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_token", &"<redacted>")
            .field("id_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("vendor_token", &"<redacted>")
            .finish()
    }
}

/// Account used for the login and the device whose telemetry is read.
#[derive(Clone, Default)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub device_id: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("device_id", &self.device_id)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Insight
// ─────────────────────────────────────────────────────────────────────────────

/// Marker that prefixes the insight text when the backend could not be used.
pub const INSIGHT_ERROR_PREFIX: &str = "Error calling Bedrock: ";

/// Outcome of insight generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insight {
    /// Text produced by the backend, unmodified.
    Generated(String),
    /// The backend failed; `reason` is the underlying error text.
    Unavailable { reason: String },
}

impl Insight {
    pub fn is_generated(&self) -> bool {
        matches!(self, Insight::Generated(_))
    }

    /// Plain-text rendering used for notifications and the envelope.
    pub fn text(&self) -> String {
        match self {
            Insight::Generated(text) => text.clone(),
            Insight::Unavailable { reason } => format!("{}{}", INSIGHT_ERROR_PREFIX, reason),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// The single externally visible result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_data: Option<SleepMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl ResultEnvelope {
    pub fn completed(
        sleep_data: SleepMetrics,
        ai_insights: String,
        notification_sent: bool,
        timestamp: String,
    ) -> Self {
        Self {
            success: true,
            sleep_data: Some(sleep_data),
            ai_insights: Some(ai_insights),
            notification_sent: Some(notification_sent),
            error: None,
            timestamp,
        }
    }

    pub fn failed(error: impl Into<String>, timestamp: String) -> Self {
        Self {
            success: false,
            sleep_data: None,
            ai_insights: None,
            notification_sent: None,
            error: Some(error.into()),
            timestamp,
        }
    }
}
