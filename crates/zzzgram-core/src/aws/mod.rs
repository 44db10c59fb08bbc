//! AWS request authentication for the generative backend and the publisher.

pub mod sigv4;

use crate::error::SigningError;

/// Static AWS credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Read credentials from the standard environment variables.
    pub fn from_env() -> Result<Self, SigningError> {
        let access_key_id = non_empty_env("AWS_ACCESS_KEY_ID")
            .ok_or(SigningError::MissingCredentials("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = non_empty_env("AWS_SECRET_ACCESS_KEY")
            .ok_or(SigningError::MissingCredentials("AWS_SECRET_ACCESS_KEY"))?;

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: non_empty_env("AWS_SESSION_TOKEN"),
        })
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// How requests to an AWS service are authenticated.
#[derive(Debug, Clone)]
pub enum AwsAuth {
    /// Signature Version 4 with access keys.
    SigV4(AwsCredentials),
    /// Service API key sent as a bearer token.
    Bearer(String),
}

impl AwsAuth {
    /// Bearer key from `bearer_var` if set, else SigV4 credentials from the environment.
    pub fn from_env(bearer_var: &str) -> Result<Self, SigningError> {
        match non_empty_env(bearer_var) {
            Some(token) => Ok(AwsAuth::Bearer(token)),
            None => AwsCredentials::from_env().map(AwsAuth::SigV4),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
