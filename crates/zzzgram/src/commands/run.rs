//! One-shot pipeline run.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use zzzgram_core::ResultEnvelope;

use crate::cli::RunArgs;
use crate::config::AppConfig;

/// HTTP-style response for serverless invocation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaResponse {
    pub status_code: u16,
    pub headers: BTreeMap<&'static str, &'static str>,
    /// The envelope, serialized as a JSON string
    pub body: String,
}

impl LambdaResponse {
    pub fn from_envelope(envelope: &ResultEnvelope) -> Result<Self> {
        let headers = BTreeMap::from([
            ("Access-Control-Allow-Origin", "*"),
            ("Content-Type", "application/json"),
        ]);

        Ok(Self {
            status_code: if envelope.success { 200 } else { 500 },
            headers,
            body: serde_json::to_string(envelope).context("Failed to serialize envelope")?,
        })
    }
}

/// Run the pipeline and print the envelope. Returns the envelope's success flag.
pub async fn execute(args: RunArgs, config: &AppConfig) -> Result<bool> {
    let account = config.account()?;
    let orchestrator = super::build_orchestrator(config)?;

    let envelope = orchestrator.run(&account, args.hours_back).await;

    let output = if args.lambda {
        to_json(&LambdaResponse::from_envelope(&envelope)?, args.pretty)?
    } else {
        to_json(&envelope, args.pretty)?
    };
    println!("{}", output);

    Ok(envelope.success)
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize output")
}
