//! Pipeline configuration.
//!
//! Every endpoint, client identifier and metadata literal the pipeline needs
//! lives here with the production values as defaults, so a config file only
//! has to name what it changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Identity provider (stage A login)
    pub identity: IdentityConfig,

    /// Vendor API (stage B exchange and telemetry)
    pub vendor: VendorConfig,

    /// Generative text backend
    pub bedrock: BedrockConfig,

    /// Notification topic
    pub notify: NotifyConfig,

    /// Time window settings
    pub schedule: ScheduleConfig,

    /// Upper bound for calls other than telemetry (unbounded when unset)
    pub request_timeout_secs: Option<u64>,
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Token endpoint URL
    pub url: String,

    /// Application client identifier
    pub client_id: String,

    /// Password-grant flow name
    pub auth_flow: String,

    /// Fixed request headers
    pub headers: BTreeMap<String, String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: "https://cognito-idp.us-east-1.amazonaws.com/".to_string(),
            client_id: "6kqofhc8hm394ielqdkvli0oea".to_string(),
            auth_flow: "USER_PASSWORD_AUTH".to_string(),
            headers: headers(&[
                (
                    "x-amz-target",
                    "AWSCognitoIdentityProviderService.InitiateAuth",
                ),
                ("accept-language", "US"),
                ("content-type", "application/x-amz-json-1.1"),
                ("user-agent", "okhttp/4.12.0"),
                ("accept", "application/json"),
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// API base URL (scheme and host)
    pub base_url: String,

    /// Session exchange path
    pub authorize_path: String,

    /// Daily sessions path; `{device_id}` is substituted
    pub sessions_path: String,

    /// Timezone label sent with telemetry queries
    pub timezone: String,

    /// Whether to request per-level breakdowns
    pub levels: bool,

    /// Telemetry request timeout in seconds
    pub timeout_secs: u64,

    /// Fixed request headers for vendor calls
    pub headers: BTreeMap<String, String>,

    /// Device/app/locale metadata sent with the session exchange
    pub device: DeviceMetadata,
}

impl VendorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-us-east-1-prod.happiestbaby.com".to_string(),
            authorize_path: "/us/me/v10/pubnub/authorize".to_string(),
            sessions_path: "/ss/me/v10/babies/{device_id}/sessions/daily".to_string(),
            timezone: "America/New_York".to_string(),
            levels: false,
            timeout_secs: 5,
            headers: headers(&[
                ("accept-language", "US"),
                ("content-type", "application/json; charset=UTF-8"),
                ("user-agent", "okhttp/4.12.0"),
                ("accept", "application/json"),
            ]),
            device: DeviceMetadata::default(),
        }
    }
}

/// Metadata the vendor expects from its mobile app during session exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceMetadata {
    pub advertiser_id: String,
    pub app_version: String,
    pub device: String,
    #[serde(rename = "deviceHasGSM")]
    pub device_has_gsm: bool,
    pub locale: String,
    pub os: String,
    pub os_version: String,
    pub platform: String,
    pub time_zone: String,
    pub user_country: String,
    pub vendor_id: String,
}

impl Default for DeviceMetadata {
    fn default() -> Self {
        Self {
            advertiser_id: String::new(),
            app_version: "1.8.7".to_string(),
            device: "panther".to_string(),
            device_has_gsm: true,
            locale: "en".to_string(),
            os: "Android".to_string(),
            os_version: "14".to_string(),
            platform: "Android".to_string(),
            time_zone: "America/New_York".to_string(),
            user_country: "US".to_string(),
            vendor_id: "eyqurgwYQSqmnExnzyiLO5".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockConfig {
    /// AWS region
    pub region: String,

    /// Model identifier
    pub model_id: String,

    /// Endpoint override (defaults to the regional runtime endpoint)
    pub endpoint: Option<String>,

    /// Generation parameters
    pub generation: GenerationConfig,
}

impl BedrockConfig {
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region))
    }
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            model_id: "amazon.titan-text-premier-v1:0".to_string(),
            endpoint: None,
            generation: GenerationConfig::default(),
        }
    }
}

/// Text generation parameters, serialized as the backend's `textGenerationConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_token_count: u32,
    pub stop_sequences: Vec<String>,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_token_count: 200,
            stop_sequences: Vec::new(),
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// AWS region
    pub region: String,

    /// Destination topic ARN
    pub topic_arn: String,

    /// Subject line
    pub subject: String,

    /// Endpoint override (defaults to the regional SNS endpoint)
    pub endpoint: Option<String>,
}

impl NotifyConfig {
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://sns.{}.amazonaws.com", self.region))
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            topic_arn: "arn:aws:sns:us-east-1:982515757790:SleepAnalyzerTopic".to_string(),
            subject: "Snoozgram Report".to_string(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA timezone used for the time window and envelope timestamp
    pub timezone: String,

    /// Lookback window when the caller does not pass one
    pub hours_back: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            hours_back: 20,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
