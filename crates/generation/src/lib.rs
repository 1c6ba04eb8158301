use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub mod client;
pub mod controller;
pub mod job;
pub mod request;

pub use client::{HttpVideoService, VideoService};
pub use controller::{GenerationController, GenerationState, SubmitOutcome, VideoUrlStore};
pub use job::{resolve_video_url, JobId, JobSnapshot};
pub use request::{combined_prompt, CaptionSettings, GenerateVideoRequest, VoiceoverRequest};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("add at least one scene before generating")]
    EmptyStoryboard,
    #[error("generation service error: {0}")]
    Service(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Connection settings for the generation service and the local media host
/// used to resolve relative asset paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Generation service endpoint
    pub api_url: String,

    /// Local media origin for relative audio/video paths
    pub media_host: String,

    /// Delay between job status checks, in milliseconds
    pub poll_interval_ms: u64,

    /// Status checks before a stuck job is reported as failed; 0 disables
    /// the bound
    pub max_poll_attempts: u32,

    /// Per-request HTTP timeout, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            media_host: "http://localhost:5002".to_string(),
            poll_interval_ms: 2500,
            max_poll_attempts: 240,
            request_timeout_secs: 30,
        }
    }
}

impl ServiceConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// With media host
    pub fn with_media_host(mut self, media_host: impl Into<String>) -> Self {
        self.media_host = media_host.into();
        self
    }

    /// With poll interval
    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// With poll attempt bound (0 disables)
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    /// With request timeout
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Save configuration to JSON
    pub fn save(&self, path: &Path) -> Result<(), GenerationError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = ServiceConfig::new("http://localhost:5000")
            .with_media_host("http://localhost:5002")
            .with_poll_interval_ms(100)
            .with_max_poll_attempts(10);

        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.max_poll_attempts, 10);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = ServiceConfig::default().with_max_poll_attempts(7);
        let json = serde_json::to_string(&config).unwrap();
        let loaded: ServiceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.max_poll_attempts, 7);
        assert_eq!(loaded.poll_interval_ms, 2500);
    }
}
