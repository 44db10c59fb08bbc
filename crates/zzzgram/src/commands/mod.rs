//! Command implementations for zzzgram CLI.
//!
//! Each submodule implements one subcommand; [`build_orchestrator`] wires the
//! pipeline from configuration and the environment.

pub mod config;
pub mod doctor;
pub mod fetch;
pub mod run;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;
use zzzgram_core::aws::{AwsAuth, AwsCredentials};
use zzzgram_core::config::GenerationConfig;
use zzzgram_core::error::{GenerationError, PublishError, SigningError};
use zzzgram_core::insight::{BedrockBackend, TextBackend};
use zzzgram_core::notify::{MessageSink, SnsSink};
use zzzgram_core::pipeline::http_client;
use zzzgram_core::PipelineOrchestrator;

use crate::config::AppConfig;

/// Environment variable holding a Bedrock API key.
pub const BEDROCK_API_KEY_VAR: &str = "AWS_BEARER_TOKEN_BEDROCK";

pub fn build_orchestrator(config: &AppConfig) -> Result<PipelineOrchestrator> {
    let pipeline = &config.pipeline;
    let client = http_client()?;

    let backend: Box<dyn TextBackend> = match AwsAuth::from_env(BEDROCK_API_KEY_VAR) {
        Ok(auth) => Box::new(
            BedrockBackend::new(client.clone(), pipeline.bedrock.clone(), auth)
                .with_timeout(pipeline.request_timeout()),
        ),
        Err(e) => {
            warn!(error = %e, "Bedrock credentials unavailable; insights will be skipped");
            Box::new(Unauthenticated(e))
        }
    };

    let sink: Box<dyn MessageSink> = match AwsCredentials::from_env() {
        Ok(credentials) => Box::new(
            SnsSink::new(client.clone(), &pipeline.notify, credentials)
                .with_timeout(pipeline.request_timeout()),
        ),
        Err(e) => {
            warn!(error = %e, "SNS credentials unavailable; notifications will be skipped");
            Box::new(Unauthenticated(e))
        }
    };

    PipelineOrchestrator::from_config(pipeline, client, backend, sink)
        .context("Failed to build pipeline")
}

/// Stand-in for an AWS-backed component whose credentials are missing.
/// Every call fails softly with the signing error.
struct Unauthenticated(SigningError);

#[async_trait]
impl TextBackend for Unauthenticated {
    async fn invoke(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String, GenerationError> {
        Err(self.0.clone().into())
    }
}

#[async_trait]
impl MessageSink for Unauthenticated {
    async fn publish(&self, _topic: &str, _subject: &str, _body: &str) -> Result<String, PublishError> {
        Err(self.0.clone().into())
    }
}
