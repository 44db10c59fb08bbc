//! Push notification of the nightly summary.
//!
//! Publishing is best effort: a failure is logged and reported as `false`,
//! never as an error.

mod sns;

pub use sns::SnsSink;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::PublishError;
use crate::types::SleepMetrics;

/// A destination for notification messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Publish `body` to `topic`; returns the message id.
    async fn publish(&self, topic: &str, subject: &str, body: &str)
        -> Result<String, PublishError>;
}

/// Formats the summary and hands it to a sink.
pub struct NotificationPublisher {
    sink: Box<dyn MessageSink>,
    topic: String,
    subject: String,
}

impl NotificationPublisher {
    pub fn new(sink: Box<dyn MessageSink>, topic: String, subject: String) -> Self {
        Self {
            sink,
            topic,
            subject,
        }
    }

    pub async fn publish(&self, insight_text: &str, metrics: &SleepMetrics) -> bool {
        let message = format_summary(insight_text, metrics);

        match self.sink.publish(&self.topic, &self.subject, &message).await {
            Ok(message_id) => {
                info!(message_id = %message_id, topic = %self.topic, "Summary published");
                true
            }
            Err(e) => {
                warn!(error = %e, topic = %self.topic, "Failed to publish summary");
                false
            }
        }
    }
}

/// Plain-text summary sent to subscribers.
pub fn format_summary(insight_text: &str, metrics: &SleepMetrics) -> String {
    format!(
        "Sleep Data Summary:
• Number of naps: {}
• Longest sleep session: {:.1} minutes
• Total sleep time: {:.1} minutes
• Day sleep: {:.1} minutes
• Night sleep: {:.1} minutes
• Night wakings: {}

Snooz Insights:
{}",
        metrics.naps,
        metrics.longest_sleep,
        metrics.total_sleep,
        metrics.day_sleep,
        metrics.night_sleep,
        metrics.night_wakings,
        insight_text,
    )
}
