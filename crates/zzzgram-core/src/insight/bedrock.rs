//! Bedrock runtime `InvokeModel` backend for Titan text models.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TextBackend;
use crate::aws::sigv4::{self, SigningRequest};
use crate::aws::AwsAuth;
use crate::config::{BedrockConfig, GenerationConfig};
use crate::error::GenerationError;

const SERVICE: &str = "bedrock";

pub struct BedrockBackend {
    client: reqwest::Client,
    config: BedrockConfig,
    auth: AwsAuth,
    timeout: Option<std::time::Duration>,
}

impl BedrockBackend {
    pub fn new(client: reqwest::Client, config: BedrockConfig, auth: AwsAuth) -> Self {
        Self {
            client,
            config,
            auth,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn invoke_url(&self) -> String {
        format!(
            "{}/model/{}/invoke",
            self.config.endpoint().trim_end_matches('/'),
            sigv4::uri_encode(&self.config.model_id, false)
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InvokeRequest<'a> {
    input_text: &'a str,
    text_generation_config: &'a GenerationConfig,
}

#[derive(Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    results: Vec<InvokeResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvokeResult {
    output_text: String,
}

#[async_trait]
impl TextBackend for BedrockBackend {
    async fn invoke(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GenerationError> {
        let body = serde_json::to_vec(&InvokeRequest {
            input_text: prompt,
            text_generation_config: config,
        })
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let url = self.invoke_url();
        debug!(url = %url, model = %self.config.model_id, "Bedrock request");

        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "application/json");

        req = match &self.auth {
            AwsAuth::Bearer(token) => req.bearer_auth(token),
            AwsAuth::SigV4(credentials) => {
                let signed = sigv4::sign(
                    &SigningRequest {
                        method: "POST",
                        url: &url,
                        headers: &[
                            ("accept", "application/json"),
                            ("content-type", "application/json"),
                        ],
                        body: &body,
                    },
                    credentials,
                    &self.config.region,
                    SERVICE,
                    Utc::now(),
                )?;
                signed.apply(req)
            }
        };
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let resp = req
            .body(body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: InvokeResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        parsed
            .results
            .into_iter()
            .next()
            .map(|r| r.output_text)
            .ok_or(GenerationError::EmptyResponse)
    }
}
