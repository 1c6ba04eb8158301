use crate::job::{JobId, JobSnapshot};
use crate::request::{GenerateVideoRequest, VoiceoverRequest};
use crate::{GenerationError, ServiceConfig};
use serde::Deserialize;
use std::time::Duration;

/// The generation service seam. The HTTP implementation talks to the real
/// backend; tests drive the controller through a scripted stand-in.
#[async_trait::async_trait]
pub trait VideoService: Send + Sync {
    /// Submits one combined rendering job. `None` means the service accepted
    /// the request without a job id (fire and forget, never polled).
    async fn submit_video(
        &self,
        request: &GenerateVideoRequest,
    ) -> Result<Option<JobId>, GenerationError>;

    /// Reads the current job state.
    async fn job_status(&self, job_id: &JobId) -> Result<JobSnapshot, GenerationError>;

    /// Generates narration audio; returns the audio URL when the service
    /// provides one.
    async fn generate_voiceover(
        &self,
        request: &VoiceoverRequest,
    ) -> Result<Option<String>, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct SubmitEnvelope {
    data: Option<SubmitData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitData {
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobEnvelope {
    data: Option<JobData>,
}

#[derive(Debug, Deserialize)]
struct JobData {
    job: Option<JobSnapshot>,
}

#[derive(Debug, Deserialize)]
struct VoiceEnvelope {
    data: Option<VoiceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoiceData {
    audio_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

async fn service_error(response: reqwest::Response) -> GenerationError {
    let status = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    GenerationError::Service(message)
}

/// reqwest-backed client for the generation service.
pub struct HttpVideoService {
    api_url: String,
    client: reqwest::Client,
}

impl HttpVideoService {
    pub fn new(config: &ServiceConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl VideoService for HttpVideoService {
    async fn submit_video(
        &self,
        request: &GenerateVideoRequest,
    ) -> Result<Option<JobId>, GenerationError> {
        let response = self
            .client
            .post(format!("{}/videos/generate-video", self.api_url))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(service_error(response).await);
        }
        let envelope: SubmitEnvelope = response.json().await?;
        Ok(envelope
            .data
            .and_then(|data| data.job_id)
            .map(JobId))
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobSnapshot, GenerationError> {
        let response = self
            .client
            .get(format!("{}/videos/job/{}", self.api_url, job_id))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(service_error(response).await);
        }
        let envelope: JobEnvelope = response.json().await?;
        Ok(envelope
            .data
            .and_then(|data| data.job)
            .unwrap_or_default())
    }

    async fn generate_voiceover(
        &self,
        request: &VoiceoverRequest,
    ) -> Result<Option<String>, GenerationError> {
        let response = self
            .client
            .post(format!("{}/videos/generate-voiceover", self.api_url))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(service_error(response).await);
        }
        let envelope: VoiceEnvelope = response.json().await?;
        Ok(envelope.data.and_then(|data| data.audio_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_envelope_with_and_without_job_id() {
        let with: SubmitEnvelope =
            serde_json::from_str(r#"{"data":{"jobId":"abc-123"}}"#).unwrap();
        assert_eq!(with.data.unwrap().job_id.as_deref(), Some("abc-123"));

        let without: SubmitEnvelope = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        assert!(without.data.unwrap().job_id.is_none());
    }

    #[test]
    fn test_job_envelope_parsing() {
        let raw = r#"{"data":{"job":{"status":"processing","progress":40,"localPath":"uploads/videos/a.mp4"}}}"#;
        let envelope: JobEnvelope = serde_json::from_str(raw).unwrap();
        let job = envelope.data.unwrap().job.unwrap();
        assert_eq!(job.status_str(), "processing");
        assert_eq!(job.progress(), 40);
        assert_eq!(job.local_path.as_deref(), Some("uploads/videos/a.mp4"));
        assert!(job.video_url.is_none());
    }

    #[test]
    fn test_empty_job_envelope_defaults_to_unknown() {
        let envelope: JobEnvelope = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        let job = envelope.data.unwrap().job.unwrap_or_default();
        assert_eq!(job.status_str(), "unknown");
    }

    #[test]
    fn test_voice_envelope_parsing() {
        let envelope: VoiceEnvelope =
            serde_json::from_str(r#"{"data":{"audioUrl":"/uploads/audio/a.mp3"}}"#).unwrap();
        assert_eq!(
            envelope.data.unwrap().audio_url.as_deref(),
            Some("/uploads/audio/a.mp3")
        );
    }
}
