//! zzzgram-core - Core library for zzzgram
//!
//! One nightly run logs in to the sleep vendor, pulls the last window of
//! telemetry, asks a text model for a friendly note and publishes a summary:
//!
//! - **auth**: Two-stage login (identity provider, then vendor authorization)
//! - **acquisition**: Telemetry fetch and seconds-to-minutes normalization
//! - **insight**: Prompt building and the generative backend
//! - **notify**: Summary formatting and the push-notification sink
//! - **pipeline**: Run sequencing and the result envelope
//! - **aws**: SigV4 request signing shared by the AWS-backed components

pub mod acquisition;
pub mod auth;
pub mod aws;
pub mod config;
pub mod error;
pub mod insight;
pub mod notify;
pub mod pipeline;
pub mod text;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use pipeline::{FetchOutput, PipelineOrchestrator};
pub use types::{Account, Insight, ResultEnvelope, SleepMetrics};
