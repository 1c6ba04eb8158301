use crate::client::VideoService;
use crate::job::{resolve_video_url, JobId};
use crate::request::{CaptionSettings, GenerateVideoRequest};
use crate::{GenerationError, ServiceConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use storyboard::{Scene, VoiceOver};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Where the resolved video URL is persisted once a job completes.
#[async_trait::async_trait]
pub trait VideoUrlStore: Send + Sync {
    async fn set_final_video_url(&self, project_id: &str, video_url: &str) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl VideoUrlStore for project::ProjectStore {
    async fn set_final_video_url(&self, project_id: &str, video_url: &str) -> anyhow::Result<()> {
        self.record_final_video_url(project_id, video_url).await?;
        Ok(())
    }
}

/// Lifecycle of one generation job. `Completed` and `Failed` are terminal
/// for that job; a new submission always starts fresh.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationState {
    Idle,
    Submitting,
    Polling {
        job_id: JobId,
        status: String,
        progress: u8,
    },
    Completed {
        video_url: String,
    },
    Failed {
        message: String,
    },
}

impl GenerationState {
    pub fn status_line(&self) -> String {
        match self {
            GenerationState::Idle => "idle".to_string(),
            GenerationState::Submitting => "submitting".to_string(),
            GenerationState::Polling {
                status, progress, ..
            } => format!("{status} ({progress}%)"),
            GenerationState::Completed { .. } => "video ready".to_string(),
            GenerationState::Failed { message } => message.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationState::Completed { .. } | GenerationState::Failed { .. }
        )
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            GenerationState::Completed { video_url } => Some(video_url),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The service assigned a job id; polling is running.
    Polling(JobId),
    /// Accepted without a job id; nothing to poll.
    FireAndForget,
}

/// Turns an editable scene sequence into one remote rendering job, tracks
/// it to completion, and publishes a single authoritative playable URL.
///
/// At most one poll task is alive per controller: a new submission aborts
/// the previous one before spawning, and dropping the controller aborts
/// whatever is left.
pub struct GenerationController {
    service: Arc<dyn VideoService>,
    store: Arc<dyn VideoUrlStore>,
    config: ServiceConfig,
    project_id: Arc<Mutex<Option<String>>>,
    state_tx: watch::Sender<GenerationState>,
    poll_task: Option<JoinHandle<()>>,
}

impl GenerationController {
    pub fn new(
        service: Arc<dyn VideoService>,
        store: Arc<dyn VideoUrlStore>,
        config: ServiceConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(GenerationState::Idle);
        Self {
            service,
            store,
            config,
            project_id: Arc::new(Mutex::new(None)),
            state_tx,
            poll_task: None,
        }
    }

    /// The project the resolved URL is persisted to. Read at completion
    /// time, so a save during polling still lands on the right document.
    pub fn set_project_id(&self, project_id: Option<String>) {
        *self.project_id.lock() = project_id;
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> GenerationState {
        self.state_tx.borrow().clone()
    }

    pub fn has_active_poll(&self) -> bool {
        self.poll_task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Submits a rendering job for the scene sequence. An empty sequence is
    /// rejected before any state change; a prior poll task is always
    /// cancelled before a new job starts.
    pub async fn generate(
        &mut self,
        scenes: &[Scene],
        style_name: &str,
        captions: CaptionSettings,
        background_music: bool,
    ) -> Result<SubmitOutcome, GenerationError> {
        let project_id = self.project_id.lock().clone();
        let request = GenerateVideoRequest::build(
            scenes,
            style_name,
            project_id.as_deref(),
            captions,
            background_music,
        )?;

        self.cancel_poll();
        self.state_tx.send_replace(GenerationState::Submitting);

        match self.service.submit_video(&request).await {
            Ok(Some(job_id)) => {
                self.state_tx.send_replace(GenerationState::Polling {
                    job_id: job_id.clone(),
                    status: "queued".to_string(),
                    progress: 0,
                });
                self.spawn_poll(job_id.clone());
                Ok(SubmitOutcome::Polling(job_id))
            }
            Ok(None) => {
                log::info!("video generation started without a job id; not polling");
                self.state_tx.send_replace(GenerationState::Idle);
                Ok(SubmitOutcome::FireAndForget)
            }
            Err(err) => {
                self.state_tx.send_replace(GenerationState::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Aborts the live poll task, if any. The remote job keeps running;
    /// only the client-side tracking stops.
    pub fn cancel_poll(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    /// Waits for the live poll task to finish; returns immediately when
    /// there is none.
    pub async fn join_poll(&mut self) {
        if let Some(task) = self.poll_task.take() {
            let _ = task.await;
        }
    }

    fn spawn_poll(&mut self, job_id: JobId) {
        let service = self.service.clone();
        let store = self.store.clone();
        let state_tx = self.state_tx.clone();
        let project_id = self.project_id.clone();
        let media_host = self.config.media_host.clone();
        let interval = self.config.poll_interval();
        let max_attempts = self.config.max_poll_attempts;

        self.poll_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately; skip it so checks start one
            // interval after submission
            ticker.tick().await;

            let mut attempts: u32 = 0;
            loop {
                ticker.tick().await;
                attempts += 1;

                match service.job_status(&job_id).await {
                    Ok(snapshot) => {
                        state_tx.send_replace(GenerationState::Polling {
                            job_id: job_id.clone(),
                            status: snapshot.status_str().to_string(),
                            progress: snapshot.progress(),
                        });

                        if snapshot.is_completed() {
                            let video_url = resolve_video_url(&media_host, &job_id, &snapshot);
                            state_tx.send_replace(GenerationState::Completed {
                                video_url: video_url.clone(),
                            });

                            let current = project_id.lock().clone();
                            match current {
                                Some(id) => {
                                    if let Err(err) =
                                        store.set_final_video_url(&id, &video_url).await
                                    {
                                        log::error!(
                                            "failed to persist video url to project {id}: {err}"
                                        );
                                    }
                                }
                                None => {
                                    log::warn!("no project id; skipping video url persistence")
                                }
                            }
                            break;
                        }
                        if snapshot.is_failed() {
                            state_tx.send_replace(GenerationState::Failed {
                                message: "video generation failed".to_string(),
                            });
                            break;
                        }
                    }
                    // transient-network tolerant: only a successful check can
                    // move the state machine forward
                    Err(err) => log::warn!("poll tick failed for job {job_id}: {err}"),
                }

                if max_attempts != 0 && attempts >= max_attempts {
                    state_tx.send_replace(GenerationState::Failed {
                        message: format!("generation timed out after {attempts} status checks"),
                    });
                    break;
                }
            }
        }));
    }

    /// Generates narration for one scene and attaches the result.
    pub async fn generate_voiceover(
        &self,
        scene: &mut Scene,
        text: &str,
        voice_type: &str,
    ) -> Result<Option<String>, GenerationError> {
        let request = crate::request::VoiceoverRequest {
            scene_id: scene.id.clone(),
            project_id: None,
            text: text.to_string(),
            voice_type: Some(voice_type.to_string()),
        };
        let audio_url = self.service.generate_voiceover(&request).await?;
        if audio_url.is_none() {
            log::warn!(
                "voice-over response carried no audio url for scene {}",
                scene.id
            );
        }
        scene.voice_over = Some(VoiceOver {
            enabled: true,
            text: text.to_string(),
            audio_url: audio_url.clone(),
            voice_type: Some(voice_type.to_string()),
        });
        Ok(audio_url)
    }

    /// Generates narration for every scene from its prompt, in order. The
    /// first failure aborts the sweep.
    pub async fn generate_all_voiceovers<F>(
        &self,
        scenes: &[Scene],
        mut on_progress: F,
    ) -> Result<(), GenerationError>
    where
        F: FnMut(usize, usize),
    {
        if scenes.is_empty() {
            return Err(GenerationError::EmptyStoryboard);
        }
        let project_id = self
            .project_id
            .lock()
            .clone()
            .unwrap_or_else(|| crate::request::TEMP_PROJECT_ID.to_string());
        let total = scenes.len();
        for (index, scene) in scenes.iter().enumerate() {
            on_progress(index + 1, total);
            let request = crate::request::VoiceoverRequest {
                scene_id: scene.id.clone(),
                project_id: Some(project_id.clone()),
                text: scene.prompt.clone(),
                voice_type: None,
            };
            self.service.generate_voiceover(&request).await?;
        }
        Ok(())
    }
}

impl Drop for GenerationController {
    fn drop(&mut self) {
        self.cancel_poll();
    }
}
