use serde::{Deserialize, Serialize};

/// Opaque job identifier assigned by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One observation of a remote job. The status vocabulary is
/// service-defined; only "completed" and "failed" are terminal, anything
/// else counts as in-progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub status: Option<String>,
    pub progress: Option<u8>,
    pub video_url: Option<String>,
    pub local_path: Option<String>,
}

impl JobSnapshot {
    pub fn status_str(&self) -> &str {
        self.status.as_deref().unwrap_or("unknown")
    }

    pub fn progress(&self) -> u8 {
        self.progress.unwrap_or(0)
    }

    pub fn is_completed(&self) -> bool {
        self.status_str() == "completed"
    }

    pub fn is_failed(&self) -> bool {
        self.status_str() == "failed"
    }

    pub fn is_terminal(&self) -> bool {
        self.is_completed() || self.is_failed()
    }
}

/// Picks the playable URL for a completed job. Priority: an absolute URL
/// from the service, then a service-relative path on the local media host,
/// then a constructed conventional location for the job's output.
pub fn resolve_video_url(media_host: &str, job_id: &JobId, snapshot: &JobSnapshot) -> String {
    let host = media_host.trim_end_matches('/');
    if let Some(url) = &snapshot.video_url {
        if url.starts_with("http") {
            return url.clone();
        }
    }
    if let Some(path) = &snapshot.local_path {
        return format!("{}/{}", host, path.trim_start_matches('/'));
    }
    format!("{host}/uploads/videos/{job_id}.mp4")
}
