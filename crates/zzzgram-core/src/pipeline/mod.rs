//! Pipeline orchestration.
//!
//! One run: login → telemetry → insight → notification → envelope.
//! Login and telemetry failures abort the run; the last two stages cannot
//! fail, so once telemetry arrives the run always completes.

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::acquisition::{DataAcquisitionClient, TimeWindow};
use crate::auth::SessionBroker;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::insight::{InsightGenerator, TextBackend};
use crate::notify::{MessageSink, NotificationPublisher};
use crate::text::sanitize_insight;
use crate::types::{Account, ResultEnvelope, SleepMetrics};

/// Progress of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Authenticated,
    DataFetched,
    InsightGenerated,
    Notified,
    NotifyFailed,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::Authenticated => "authenticated",
            RunState::DataFetched => "data_fetched",
            RunState::InsightGenerated => "insight_generated",
            RunState::Notified => "notified",
            RunState::NotifyFailed => "notify_failed",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }
}

/// Telemetry returned by [`PipelineOrchestrator::fetch_only`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FetchOutput {
    Metrics(SleepMetrics),
    Raw(serde_json::Value),
}

/// Sequences the pipeline components and builds the result envelope.
pub struct PipelineOrchestrator {
    broker: SessionBroker,
    acquisition: DataAcquisitionClient,
    generator: InsightGenerator,
    publisher: NotificationPublisher,
    timezone: Tz,
    default_hours_back: u32,
}

impl PipelineOrchestrator {
    /// Wire every component from configuration around one shared HTTP client.
    pub fn from_config(
        config: &PipelineConfig,
        client: reqwest::Client,
        backend: Box<dyn TextBackend>,
        sink: Box<dyn MessageSink>,
    ) -> Result<Self> {
        let timezone = parse_timezone(&config.schedule.timezone)?;

        let broker = SessionBroker::new(
            client.clone(),
            config.identity.clone(),
            config.vendor.clone(),
        )
        .with_timeout(config.request_timeout());
        let acquisition = DataAcquisitionClient::new(client, config.vendor.clone());
        let generator = InsightGenerator::new(backend, config.bedrock.generation.clone());
        let publisher = NotificationPublisher::new(
            sink,
            config.notify.topic_arn.clone(),
            config.notify.subject.clone(),
        );

        Ok(Self {
            broker,
            acquisition,
            generator,
            publisher,
            timezone,
            default_hours_back: config.schedule.hours_back,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Run the whole pipeline now.
    pub async fn run(&self, account: &Account, hours_back: Option<u32>) -> ResultEnvelope {
        let now = Utc::now().with_timezone(&self.timezone);
        self.run_at(account, hours_back, now).await
    }

    /// Run the whole pipeline as if the current time were `now`.
    pub async fn run_at(
        &self,
        account: &Account,
        hours_back: Option<u32>,
        now: DateTime<Tz>,
    ) -> ResultEnvelope {
        let run_id = Uuid::new_v4();
        let hours_back = hours_back.unwrap_or(self.default_hours_back);
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Micros, false);

        async {
            info!(hours_back, "Starting run");
            match self.execute(account, hours_back, now, &timestamp).await {
                Ok(envelope) => envelope,
                Err(e) => {
                    error!(error = %e, state = RunState::Failed.as_str(), "Run aborted");
                    ResultEnvelope::failed(e.to_string(), timestamp.clone())
                }
            }
        }
        .instrument(info_span!("run", run_id = %run_id))
        .await
    }

    async fn execute(
        &self,
        account: &Account,
        hours_back: u32,
        now: DateTime<Tz>,
        timestamp: &str,
    ) -> Result<ResultEnvelope> {
        let mut state = RunState::Init;
        let window = time_window(now, hours_back)?;

        let credentials = self
            .broker
            .authenticate(&account.username, &account.password)
            .await?;
        advance(&mut state, RunState::Authenticated);

        let metrics = self
            .acquisition
            .fetch(&credentials, &account.device_id, &window)
            .await?;
        advance(&mut state, RunState::DataFetched);

        let insight = self.generator.generate(&metrics).await;
        advance(&mut state, RunState::InsightGenerated);

        let insight_text = insight.text();
        let notification_sent = self.publisher.publish(&insight_text, &metrics).await;
        advance(
            &mut state,
            if notification_sent {
                RunState::Notified
            } else {
                RunState::NotifyFailed
            },
        );

        advance(&mut state, RunState::Done);
        info!(
            insight_generated = insight.is_generated(),
            notification_sent, "Run complete"
        );

        Ok(ResultEnvelope::completed(
            metrics,
            sanitize_insight(&insight_text),
            notification_sent,
            timestamp.to_string(),
        ))
    }

    /// Login and fetch telemetry only; no insight, no notification.
    pub async fn fetch_only(
        &self,
        account: &Account,
        hours_back: Option<u32>,
        raw: bool,
    ) -> Result<FetchOutput> {
        let now = Utc::now().with_timezone(&self.timezone);
        let window = time_window(now, hours_back.unwrap_or(self.default_hours_back))?;

        let credentials = self
            .broker
            .authenticate(&account.username, &account.password)
            .await?;

        if raw {
            let value = self
                .acquisition
                .fetch_raw(&credentials, &account.device_id, &window)
                .await?;
            Ok(FetchOutput::Raw(value))
        } else {
            let metrics = self
                .acquisition
                .fetch(&credentials, &account.device_id, &window)
                .await?;
            Ok(FetchOutput::Metrics(metrics))
        }
    }
}

/// `[now - hours_back, now]` as local wall-clock times.
///
/// The lookback is subtracted from the wall clock, so a window spanning a DST
/// change still starts `hours_back` clock hours before `now`.
pub fn time_window(now: DateTime<Tz>, hours_back: u32) -> Result<TimeWindow> {
    let end = now.naive_local();
    let start = end
        .checked_sub_signed(chrono::Duration::hours(i64::from(hours_back)))
        .ok_or_else(|| {
            Error::Config(format!("Lookback of {} hours is out of range", hours_back))
        })?;
    Ok(TimeWindow { start, end })
}

/// The HTTP client shared by every component of a run.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("zzzgram/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::HttpClient(e.to_string()))
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| Error::Config(format!("Unknown timezone '{}': {}", name, e)))
}

fn advance(state: &mut RunState, next: RunState) {
    debug!(from = state.as_str(), to = next.as_str(), "Run state transition");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdentityConfig, VendorConfig};
    use crate::error::{GenerationError, PublishError};
    use crate::testing::{MockUpstream, Recorded};
    use crate::types::INSIGHT_ERROR_PREFIX;
    use async_trait::async_trait;
    use axum::{routing::get, routing::post, Json, Router};
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // ─────────────────────────────────────────────────────────────────────────
    // Fakes
    // ─────────────────────────────────────────────────────────────────────────

    #[derive(Clone)]
    struct FakeBackend {
        reply: std::result::Result<String, GenerationError>,
        calls: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl TextBackend for FakeBackend {
        async fn invoke(
            &self,
            _prompt: &str,
            _config: &crate::config::GenerationConfig,
        ) -> std::result::Result<String, GenerationError> {
            *self.calls.lock().unwrap() += 1;
            self.reply.clone()
        }
    }

    #[derive(Clone, Default)]
    struct FakeSink {
        fail: bool,
        bodies: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl MessageSink for FakeSink {
        async fn publish(
            &self,
            _topic: &str,
            _subject: &str,
            body: &str,
        ) -> std::result::Result<String, PublishError> {
            self.bodies.lock().unwrap().push(body.to_string());
            if self.fail {
                Err(PublishError::Transport("SNS unavailable".into()))
            } else {
                Ok("msg-1".into())
            }
        }
    }

    struct Harness {
        orchestrator: PipelineOrchestrator,
        upstream_log: Recorded,
        backend_calls: Arc<Mutex<usize>>,
        sink: FakeSink,
        _upstream: MockUpstream,
    }

    fn vendor_routes(log: Recorded, identity_reply: Value, telemetry_delay: Duration) -> Router {
        let vendor_log = log.clone();
        let telemetry_log = log;
        Router::new()
            .route(
                "/identity",
                post(move || {
                    let reply = identity_reply.clone();
                    async move { Json(reply) }
                }),
            )
            .route(
                "/us/me/v10/pubnub/authorize",
                post(move |headers: axum::http::HeaderMap| {
                    let log = vendor_log.clone();
                    async move {
                        log.push("vendor", &headers, "");
                        Json(json!({ "snoo": { "token": "vendor-token" } }))
                    }
                }),
            )
            .route(
                "/ss/me/v10/babies/{device_id}/sessions/daily",
                get(move |uri: axum::http::Uri, headers: axum::http::HeaderMap| {
                    let log = telemetry_log.clone();
                    async move {
                        log.push_uri("telemetry", &uri, &headers);
                        tokio::time::sleep(telemetry_delay).await;
                        Json(json!({
                            "naps": 3,
                            "longestSleep": 7200,
                            "totalSleep": 28800,
                            "daySleep": 10800,
                            "nightSleep": 18000,
                            "nightWakings": 2
                        }))
                    }
                }),
            )
    }

    fn good_identity() -> Value {
        json!({
            "AuthenticationResult": {
                "AccessToken": "access",
                "IdToken": "id-token",
                "RefreshToken": "refresh"
            }
        })
    }

    async fn harness(
        identity_reply: Value,
        backend_reply: std::result::Result<String, GenerationError>,
        sink: FakeSink,
        telemetry_delay: Duration,
        vendor_timeout_secs: u64,
    ) -> Harness {
        let upstream_log = Recorded::default();
        let upstream = MockUpstream::start(vendor_routes(
            upstream_log.clone(),
            identity_reply,
            telemetry_delay,
        ))
        .await;

        let config = PipelineConfig {
            identity: IdentityConfig {
                url: upstream.url("/identity"),
                ..Default::default()
            },
            vendor: VendorConfig {
                base_url: upstream.base_url(),
                timeout_secs: vendor_timeout_secs,
                ..Default::default()
            },
            ..Default::default()
        };

        let backend_calls = Arc::new(Mutex::new(0));
        let orchestrator = PipelineOrchestrator::from_config(
            &config,
            reqwest::Client::new(),
            Box::new(FakeBackend {
                reply: backend_reply,
                calls: backend_calls.clone(),
            }),
            Box::new(sink.clone()),
        )
        .unwrap();

        Harness {
            orchestrator,
            upstream_log,
            backend_calls,
            sink,
            _upstream: upstream,
        }
    }

    fn account() -> Account {
        Account {
            username: "parent@example.com".into(),
            password: "hunter2".into(),
            device_id: "baby-1".into(),
        }
    }

    fn june_morning() -> DateTime<Tz> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(2025, 6, 21, 8, 0, 0)
            .unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_time_window() {
        let window = time_window(june_morning(), 20).unwrap();
        assert_eq!(window.start_param(), "2025-06-20T12:00:00");
        assert_eq!(window.end_param(), "2025-06-21T08:00:00");
    }

    #[test]
    fn test_time_window_uses_wall_clock_across_dst() {
        // Clocks sprang forward at 02:00 on 2025-03-09
        let noon = chrono_tz::America::New_York
            .with_ymd_and_hms(2025, 3, 9, 12, 0, 0)
            .unwrap();

        let window = time_window(noon, 20).unwrap();
        assert_eq!(window.start_param(), "2025-03-08T16:00:00");
        assert_eq!(window.end_param(), "2025-03-09T12:00:00");
    }

    #[test]
    fn test_time_window_out_of_range() {
        let err = time_window(june_morning(), u32::MAX).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("4294967295 hours"));
    }

    #[tokio::test]
    async fn test_out_of_range_lookback_fails_the_run() {
        let h = harness(
            good_identity(),
            Ok("unused".into()),
            FakeSink::default(),
            Duration::ZERO,
            5,
        )
        .await;

        let envelope = h
            .orchestrator
            .run_at(&account(), Some(u32::MAX), june_morning())
            .await;

        assert!(!envelope.success);
        assert!(envelope.error.as_deref().unwrap().contains("out of range"));
        assert!(h.upstream_log.calls().is_empty());
        assert_eq!(*h.backend_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(
            parse_timezone("America/New_York").unwrap(),
            chrono_tz::America::New_York
        );
        assert!(matches!(parse_timezone("Mars/Olympus"), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_successful_run() {
        let h = harness(
            good_identity(),
            Ok("\"Five hours straight!\n  Coffee optional.\"".into()),
            FakeSink::default(),
            Duration::ZERO,
            5,
        )
        .await;

        let envelope = h.orchestrator.run_at(&account(), Some(24), june_morning()).await;

        assert!(envelope.success);
        assert_eq!(
            envelope.sleep_data,
            Some(SleepMetrics {
                naps: 3,
                longest_sleep: 120.0,
                total_sleep: 480.0,
                day_sleep: 180.0,
                night_sleep: 300.0,
                night_wakings: 2,
            })
        );
        assert_eq!(
            envelope.ai_insights.as_deref(),
            Some("Five hours straight! Coffee optional.")
        );
        assert_eq!(envelope.notification_sent, Some(true));
        assert_eq!(envelope.timestamp, "2025-06-21T08:00:00.000000-04:00");
        assert!(envelope.error.is_none());

        // Notification carries the unsanitized text
        let bodies = h.sink.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].contains("\"Five hours straight!\n  Coffee optional.\""));

        let telemetry = h
            .upstream_log
            .calls()
            .into_iter()
            .find(|c| c.route == "telemetry")
            .unwrap();
        assert_eq!(telemetry.header("authorization").as_deref(), Some("Bearer id-token"));
        let uri = telemetry.uri.unwrap();
        assert!(uri.contains("startTime=2025-06-20T08:00:00"));
        assert!(uri.contains("endTime=2025-06-21T08:00:00"));
    }

    #[tokio::test]
    async fn test_default_lookback() {
        let h = harness(
            good_identity(),
            Ok("ok".into()),
            FakeSink::default(),
            Duration::ZERO,
            5,
        )
        .await;

        h.orchestrator.run_at(&account(), None, june_morning()).await;

        let telemetry = h
            .upstream_log
            .calls()
            .into_iter()
            .find(|c| c.route == "telemetry")
            .unwrap();
        assert!(telemetry.uri.unwrap().contains("startTime=2025-06-20T12:00:00"));
    }

    #[tokio::test]
    async fn test_missing_authentication_result_aborts_before_everything() {
        let h = harness(
            json!({ "ChallengeName": "SMS_MFA" }),
            Ok("unused".into()),
            FakeSink::default(),
            Duration::ZERO,
            5,
        )
        .await;

        let envelope = h.orchestrator.run_at(&account(), None, june_morning()).await;

        assert!(!envelope.success);
        assert!(envelope.error.as_deref().unwrap().contains("AuthenticationResult"));
        assert!(envelope.sleep_data.is_none());
        assert!(envelope.ai_insights.is_none());
        assert!(envelope.notification_sent.is_none());
        assert_eq!(h.upstream_log.count("vendor"), 0);
        assert_eq!(h.upstream_log.count("telemetry"), 0);
        assert_eq!(*h.backend_calls.lock().unwrap(), 0);
        assert!(h.sink.bodies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_acquisition_timeout_aborts_before_generation() {
        let h = harness(
            good_identity(),
            Ok("unused".into()),
            FakeSink::default(),
            Duration::from_secs(3),
            1,
        )
        .await;

        let envelope = h.orchestrator.run_at(&account(), None, june_morning()).await;

        assert!(!envelope.success);
        assert!(envelope.error.as_deref().unwrap().contains("timed out"));
        assert_eq!(*h.backend_calls.lock().unwrap(), 0);
        assert!(h.sink.bodies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generator_fault_is_soft() {
        let h = harness(
            good_identity(),
            Err(GenerationError::Transport("Bedrock API error".into())),
            FakeSink::default(),
            Duration::ZERO,
            5,
        )
        .await;

        let envelope = h.orchestrator.run_at(&account(), None, june_morning()).await;

        assert!(envelope.success);
        let insight = envelope.ai_insights.unwrap();
        assert!(insight.starts_with(INSIGHT_ERROR_PREFIX));
        assert!(insight.contains("Bedrock API error"));
        assert_eq!(envelope.notification_sent, Some(true));

        let bodies = h.sink.bodies.lock().unwrap();
        assert!(bodies[0].contains("Error calling Bedrock: Bedrock API error"));
    }

    #[tokio::test]
    async fn test_publisher_fault_is_soft() {
        let h = harness(
            good_identity(),
            Ok("Great sleep!".into()),
            FakeSink {
                fail: true,
                ..Default::default()
            },
            Duration::ZERO,
            5,
        )
        .await;

        let envelope = h.orchestrator.run_at(&account(), None, june_morning()).await;

        assert!(envelope.success);
        assert_eq!(envelope.notification_sent, Some(false));
        assert_eq!(envelope.ai_insights.as_deref(), Some("Great sleep!"));
    }

    #[tokio::test]
    async fn test_fetch_only_raw_and_normalized() {
        let h = harness(
            good_identity(),
            Ok("unused".into()),
            FakeSink::default(),
            Duration::ZERO,
            5,
        )
        .await;

        match h.orchestrator.fetch_only(&account(), Some(12), true).await.unwrap() {
            FetchOutput::Raw(value) => assert_eq!(value["nightSleep"], 18000),
            other => panic!("expected raw payload, got {:?}", other),
        }
        match h.orchestrator.fetch_only(&account(), Some(12), false).await.unwrap() {
            FetchOutput::Metrics(metrics) => assert_eq!(metrics.night_sleep, 300.0),
            other => panic!("expected metrics, got {:?}", other),
        }

        assert_eq!(*h.backend_calls.lock().unwrap(), 0);
        assert!(h.sink.bodies.lock().unwrap().is_empty());
    }
}
