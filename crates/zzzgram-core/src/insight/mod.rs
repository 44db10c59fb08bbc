//! Natural-language commentary on a night's sleep.
//!
//! The generator never fails outward: backend errors become
//! [`Insight::Unavailable`] and the run carries on.

mod bedrock;

pub use bedrock::BedrockBackend;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::types::{Insight, SleepMetrics};

/// A text generation backend.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Generate text for `prompt`, returning the first candidate.
    async fn invoke(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GenerationError>;
}

/// Builds the prompt and asks the backend for a short message.
pub struct InsightGenerator {
    backend: Box<dyn TextBackend>,
    generation: GenerationConfig,
}

impl InsightGenerator {
    pub fn new(backend: Box<dyn TextBackend>, generation: GenerationConfig) -> Self {
        Self {
            backend,
            generation,
        }
    }

    pub async fn generate(&self, metrics: &SleepMetrics) -> Insight {
        let prompt = build_prompt(metrics);

        match self.backend.invoke(&prompt, &self.generation).await {
            Ok(text) => {
                info!(chars = text.len(), "Insight generated");
                Insight::Generated(text)
            }
            Err(e) => {
                warn!(error = %e, "Insight generation failed");
                Insight::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Prompt for the backend. Only night sleep and night wakings are included.
pub fn build_prompt(metrics: &SleepMetrics) -> String {
    format!(
        "Based on the following baby sleep data, provide a fun, friendly message for the parent:

Sleep Data:
- Night sleep: {night_sleep:.1} minutes
- Night wakings: {night_wakings}

Please provide:
1. A fun, friendly message for the parent. Consider the data to determine how well and how much the baby slept, especially overnight, and how tired the parent may be because they may have been up all night. Ideally the baby should be sleeping several (6+) hours a night without too many wake ups.
2. It should be a short message, just a few lines. It could be a poem, if appropriate. The output should not have any code in it, only human readable text. It should be encouraging and not expressing any concern.
3. Keep the tone fun and light hearted. It can even be sarcastic and witty.

Keep the response concise and parent-friendly.

An example output if the baby did not sleep many hours at night and had a lot of night wakings could be something like \"Wow! that looks like a sleepless night. Hope you can drink lots of coffee today and get some rest\"
",
        night_sleep = metrics.night_sleep,
        night_wakings = metrics.night_wakings,
    )
}
