//! SNS `Publish` over the query API.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::MessageSink;
use crate::aws::sigv4::{self, SigningRequest};
use crate::aws::AwsCredentials;
use crate::config::NotifyConfig;
use crate::error::PublishError;

const SERVICE: &str = "sns";
const API_VERSION: &str = "2010-03-31";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

pub struct SnsSink {
    client: reqwest::Client,
    endpoint: String,
    region: String,
    credentials: AwsCredentials,
    timeout: Option<std::time::Duration>,
}

impl SnsSink {
    pub fn new(client: reqwest::Client, config: &NotifyConfig, credentials: AwsCredentials) -> Self {
        Self {
            client,
            endpoint: config.endpoint(),
            region: config.region.clone(),
            credentials,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl MessageSink for SnsSink {
    async fn publish(
        &self,
        topic: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, PublishError> {
        let form = sigv4::form_encode(&[
            ("Action", "Publish"),
            ("Message", body),
            ("Subject", subject),
            ("TopicArn", topic),
            ("Version", API_VERSION),
        ]);
        let url = format!("{}/", self.endpoint.trim_end_matches('/'));
        debug!(url = %url, topic = %topic, "SNS publish request");

        let signed = sigv4::sign(
            &SigningRequest {
                method: "POST",
                url: &url,
                headers: &[("content-type", FORM_CONTENT_TYPE)],
                body: form.as_bytes(),
            },
            &self.credentials,
            &self.region,
            SERVICE,
            Utc::now(),
        )?;

        let mut req = signed.apply(
            self.client
                .post(&url)
                .header("content-type", FORM_CONTENT_TYPE)
                .body(form),
        );
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(PublishError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        match message_id(&text) {
            Some(id) => Ok(id),
            None => {
                warn!(topic = %topic, "SNS accepted the publish but returned no MessageId");
                Ok(String::new())
            }
        }
    }
}

/// Pull `<MessageId>` out of a `PublishResponse` document.
fn message_id(xml: &str) -> Option<String> {
    let start = xml.find("<MessageId>")? + "<MessageId>".len();
    let end = xml[start..].find("</MessageId>")? + start;
    Some(xml[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockUpstream, Recorded};
    use axum::{http::StatusCode, routing::post, Router};

    const PUBLISH_RESPONSE: &str = r#"<PublishResponse xmlns="http://sns.amazonaws.com/doc/2010-03-31/">
  <PublishResult>
    <MessageId>567910cd-659e-55d4-8ccb-5aaf14679dc0</MessageId>
  </PublishResult>
  <ResponseMetadata>
    <RequestId>d74b8436-ae13-5ab4-a9ff-ce54dfea72a0</RequestId>
  </ResponseMetadata>
</PublishResponse>"#;

    fn sink_for(upstream: &MockUpstream) -> SnsSink {
        SnsSink::new(
            reqwest::Client::new(),
            &NotifyConfig {
                endpoint: Some(upstream.base_url()),
                ..Default::default()
            },
            AwsCredentials {
                access_key_id: "AKIDEXAMPLE".into(),
                secret_access_key: "secret".into(),
                session_token: Some("session-token".into()),
            },
        )
    }

    #[test]
    fn test_message_id() {
        assert_eq!(
            message_id(PUBLISH_RESPONSE).as_deref(),
            Some("567910cd-659e-55d4-8ccb-5aaf14679dc0")
        );
        assert_eq!(message_id("<PublishResponse/>"), None);
    }

    #[tokio::test]
    async fn test_publish_form_body_and_signature() {
        let recorded = Recorded::default();
        let log = recorded.clone();
        let routes = Router::new().route(
            "/",
            post(move |headers: axum::http::HeaderMap, body: String| {
                let log = log.clone();
                async move {
                    log.push("publish", &headers, &body);
                    PUBLISH_RESPONSE
                }
            }),
        );
        let upstream = MockUpstream::start(routes).await;

        let id = sink_for(&upstream)
            .publish(
                "arn:aws:sns:us-east-1:1234567890:SleepAnalyzerTopic",
                "Snoozgram Report",
                "Night wakings: 2",
            )
            .await
            .unwrap();
        assert_eq!(id, "567910cd-659e-55d4-8ccb-5aaf14679dc0");

        let calls = recorded.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].body,
            "Action=Publish&Message=Night%20wakings%3A%202&Subject=Snoozgram%20Report\
             &TopicArn=arn%3Aaws%3Asns%3Aus-east-1%3A1234567890%3ASleepAnalyzerTopic\
             &Version=2010-03-31"
        );
        let auth = calls[0].header("authorization").unwrap();
        assert!(auth.contains("/us-east-1/sns/aws4_request"));
        assert!(auth.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
        assert_eq!(
            calls[0].header("x-amz-security-token").as_deref(),
            Some("session-token")
        );
    }

    #[tokio::test]
    async fn test_publish_without_message_id_still_succeeds() {
        let routes = Router::new().route("/", post(|| async { "<PublishResponse/>" }));
        let upstream = MockUpstream::start(routes).await;

        let id = sink_for(&upstream)
            .publish("topic", "subject", "body")
            .await
            .unwrap();

        assert_eq!(id, "");
    }

    #[tokio::test]
    async fn test_publish_error_status() {
        let routes = Router::new().route(
            "/",
            post(|| async { (StatusCode::NOT_FOUND, "<Error><Code>NotFound</Code></Error>") }),
        );
        let upstream = MockUpstream::start(routes).await;

        let err = sink_for(&upstream)
            .publish("topic", "subject", "body")
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Status { status: 404, .. }));
    }
}
