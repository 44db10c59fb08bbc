//! Telemetry acquisition.
//!
//! Fetches the vendor's daily sleep summary for a device over a local time
//! window and normalizes it into [`SleepMetrics`]. This is the only bounded
//! call in the pipeline.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::auth::header_map;
use crate::config::VendorConfig;
use crate::error::FetchError;
use crate::types::{RawSleepSummary, SessionCredentials, SleepMetrics};

/// Wall-clock format the vendor expects for time bounds (no offset).
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Local time bounds of a telemetry query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn start_param(&self) -> String {
        self.start.format(LOCAL_TIME_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(LOCAL_TIME_FORMAT).to_string()
    }
}

/// Client for the vendor's telemetry endpoint.
pub struct DataAcquisitionClient {
    client: reqwest::Client,
    vendor: VendorConfig,
}

impl DataAcquisitionClient {
    pub fn new(client: reqwest::Client, vendor: VendorConfig) -> Self {
        Self { client, vendor }
    }

    /// Build the daily sessions URL for a device and window.
    pub fn sleep_url(&self, device_id: &str, window: &TimeWindow) -> String {
        let path = self.vendor.sessions_path.replace("{device_id}", device_id);
        format!(
            "{}{}?startTime={}&endTime={}&timezone={}&levels={}",
            self.vendor.base_url,
            path,
            window.start_param(),
            window.end_param(),
            self.vendor.timezone,
            self.vendor.levels,
        )
    }

    /// Fetch and normalize the sleep summary.
    pub async fn fetch(
        &self,
        credentials: &SessionCredentials,
        device_id: &str,
        window: &TimeWindow,
    ) -> Result<SleepMetrics, FetchError> {
        let body = self.fetch_body(credentials, device_id, window).await?;
        let raw: RawSleepSummary =
            serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;
        let metrics = SleepMetrics::from_raw(&raw)?;

        info!(
            naps = metrics.naps,
            night_sleep_minutes = metrics.night_sleep,
            night_wakings = metrics.night_wakings,
            "Sleep telemetry acquired"
        );
        Ok(metrics)
    }

    /// Fetch the vendor payload without normalization.
    pub async fn fetch_raw(
        &self,
        credentials: &SessionCredentials,
        device_id: &str,
        window: &TimeWindow,
    ) -> Result<serde_json::Value, FetchError> {
        let body = self.fetch_body(credentials, device_id, window).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    async fn fetch_body(
        &self,
        credentials: &SessionCredentials,
        device_id: &str,
        window: &TimeWindow,
    ) -> Result<String, FetchError> {
        let url = self.sleep_url(device_id, window);
        let timeout = self.vendor.timeout();
        debug!(url = %url, ?timeout, "Telemetry request");

        let resp = self
            .client
            .get(&url)
            .headers(header_map(&self.vendor.headers))
            .bearer_auth(credentials.bearer())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

fn transport_error(e: reqwest::Error, timeout: std::time::Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Transport(e.to_string())
    }
}
