//! Two-stage federated login.
//!
//! Stage A posts a password grant to the identity provider and yields
//! access/id/refresh tokens. Stage B presents the id token to the vendor and
//! yields a vendor session token. Nothing is cached: every run logs in again,
//! and neither stage retries.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{IdentityConfig, VendorConfig};
use crate::error::AuthError;
use crate::types::SessionCredentials;

const IDENTITY_STAGE: &str = "identity provider";
const VENDOR_STAGE: &str = "vendor authorization";

/// Performs the login and hands out per-run session credentials.
pub struct SessionBroker {
    client: reqwest::Client,
    identity: IdentityConfig,
    vendor: VendorConfig,
    timeout: Option<std::time::Duration>,
}

impl SessionBroker {
    pub fn new(client: reqwest::Client, identity: IdentityConfig, vendor: VendorConfig) -> Self {
        Self {
            client,
            identity,
            vendor,
            timeout: None,
        }
    }

    /// Bound both login calls (unbounded by default).
    pub fn with_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run both stages and return the credentials for this run.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionCredentials, AuthError> {
        let tokens = self.identity_login(username, password).await?;
        info!("Identity provider login succeeded");

        let vendor_token = self.vendor_authorize(&tokens.id_token).await?;
        info!("Vendor session established");

        Ok(SessionCredentials {
            access_token: tokens.access_token,
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            vendor_token,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stage A
    // ─────────────────────────────────────────────────────────────────────────

    async fn identity_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IdentityTokens, AuthError> {
        let body = InitiateAuthRequest {
            auth_parameters: AuthParameters {
                password,
                username,
            },
            auth_flow: &self.identity.auth_flow,
            client_id: &self.identity.client_id,
        };
        let payload = serde_json::to_vec(&body).map_err(|e| AuthError::InvalidResponse {
            stage: IDENTITY_STAGE,
            message: e.to_string(),
        })?;

        debug!(url = %self.identity.url, "Identity provider request");
        let mut req = self
            .client
            .post(&self.identity.url)
            .headers(header_map(&self.identity.headers))
            .body(payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| AuthError::IdentityTransport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AuthError::IdentityTransport(e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: identity_error_message(&text),
            });
        }

        parse_identity_response(&text)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stage B
    // ─────────────────────────────────────────────────────────────────────────

    async fn vendor_authorize(&self, id_token: &str) -> Result<String, AuthError> {
        let url = format!("{}{}", self.vendor.base_url, self.vendor.authorize_path);
        debug!(url = %url, "Vendor authorization request");

        let mut req = self
            .client
            .post(&url)
            .headers(header_map(&self.vendor.headers))
            .bearer_auth(id_token)
            .json(&self.vendor.device);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| AuthError::VendorTransport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AuthError::VendorTransport(e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::VendorRejected {
                status: status.as_u16(),
                message: text,
            });
        }

        parse_vendor_response(&text)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    auth_parameters: AuthParameters<'a>,
    auth_flow: &'a str,
    client_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "UPPERCASE")]
struct AuthParameters<'a> {
    password: &'a str,
    username: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct IdentityErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct VendorAuthResponse {
    snoo: Option<VendorSession>,
}

#[derive(Deserialize)]
struct VendorSession {
    token: Option<String>,
}

struct IdentityTokens {
    access_token: String,
    id_token: String,
    refresh_token: String,
}

fn parse_identity_response(text: &str) -> Result<IdentityTokens, AuthError> {
    let parsed: InitiateAuthResponse =
        serde_json::from_str(text).map_err(|e| AuthError::InvalidResponse {
            stage: IDENTITY_STAGE,
            message: e.to_string(),
        })?;
    let result = parsed
        .authentication_result
        .ok_or_else(|| AuthError::missing(IDENTITY_STAGE, "AuthenticationResult"))?;

    Ok(IdentityTokens {
        access_token: result
            .access_token
            .ok_or_else(|| AuthError::missing(IDENTITY_STAGE, "AccessToken"))?,
        id_token: result
            .id_token
            .ok_or_else(|| AuthError::missing(IDENTITY_STAGE, "IdToken"))?,
        refresh_token: result
            .refresh_token
            .ok_or_else(|| AuthError::missing(IDENTITY_STAGE, "RefreshToken"))?,
    })
}

fn parse_vendor_response(text: &str) -> Result<String, AuthError> {
    let parsed: VendorAuthResponse =
        serde_json::from_str(text).map_err(|e| AuthError::InvalidResponse {
            stage: VENDOR_STAGE,
            message: e.to_string(),
        })?;
    parsed
        .snoo
        .and_then(|s| s.token)
        .ok_or_else(|| AuthError::missing(VENDOR_STAGE, "snoo.token"))
}

/// Best-effort description of an identity provider error body.
fn identity_error_message(text: &str) -> String {
    match serde_json::from_str::<IdentityErrorBody>(text) {
        Ok(IdentityErrorBody {
            kind: Some(kind),
            message: Some(message),
        }) => format!("{}: {}", kind, message),
        Ok(IdentityErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(IdentityErrorBody {
            kind: Some(kind), ..
        }) => kind,
        _ => text.to_string(),
    }
}

pub(crate) fn header_map(headers: &std::collections::BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid configured header"),
        }
    }
    map
}
