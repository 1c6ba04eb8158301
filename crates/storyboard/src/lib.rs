use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

mod presets;
pub use presets::*;
mod tracks;
pub use tracks::*;

#[derive(Debug, Error)]
pub enum StoryboardError {
    #[error("scene not found: {0}")]
    SceneNotFound(String),
    #[error("scene index out of range: {0}")]
    IndexOutOfRange(usize),
    #[error("audio track not found: {0}")]
    TrackNotFound(String),
}

/// Scene durations accepted by the editor, in seconds.
pub const MIN_SCENE_SECS: u32 = 5;
pub const MAX_SCENE_SECS: u32 = 30;

/// Duration substituted for a zero duration when billing a generation job.
pub const DEFAULT_SCENE_SECS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneStatus {
    Pending,
    Generating,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceOver {
    pub enabled: bool,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_type: Option<String>,
}

/// One storyboard unit: a text prompt rendered for `duration` seconds in a
/// given visual style, optionally narrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub prompt: String,
    #[serde(rename = "duration")]
    pub duration_secs: u32,
    pub style: String,
    pub status: SceneStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_over: Option<VoiceOver>,
}

impl Scene {
    pub fn new(prompt: impl Into<String>, duration_secs: u32, style: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            duration_secs: clamp_duration(duration_secs),
            style: style.into(),
            status: SceneStatus::Pending,
            voice_over: None,
        }
    }

    /// Duration used when billing a generation job: zero falls back to the
    /// default scene length.
    pub fn billed_duration_secs(&self) -> u32 {
        if self.duration_secs == 0 {
            DEFAULT_SCENE_SECS
        } else {
            self.duration_secs
        }
    }

    pub fn has_voiced_audio(&self) -> bool {
        self.voice_over
            .as_ref()
            .map(|vo| vo.enabled && vo.audio_url.is_some())
            .unwrap_or(false)
    }
}

pub fn clamp_duration(duration_secs: u32) -> u32 {
    duration_secs.clamp(MIN_SCENE_SECS, MAX_SCENE_SECS)
}

/// Ordered scene sequence plus the selected style preset. Order is
/// meaningful: it determines combined-prompt order and cumulative timeline
/// offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storyboard {
    pub scenes: Vec<Scene>,
    pub selected_preset: String,
}

impl Default for Storyboard {
    fn default() -> Self {
        Self {
            scenes: Vec::new(),
            selected_preset: DEFAULT_PRESET_ID.to_string(),
        }
    }
}

impl Storyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn scene_mut(&mut self, id: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.id == id)
    }

    /// Appends a new scene and returns its id.
    pub fn add_scene(
        &mut self,
        prompt: impl Into<String>,
        duration_secs: u32,
        style: impl Into<String>,
    ) -> String {
        let scene = Scene::new(prompt, duration_secs, style);
        let id = scene.id.clone();
        self.scenes.push(scene);
        id
    }

    /// Mutates a scene in place; voice-over and status are untouched.
    pub fn edit_scene(
        &mut self,
        id: &str,
        prompt: impl Into<String>,
        duration_secs: u32,
        style: impl Into<String>,
    ) -> Result<(), StoryboardError> {
        let scene = self
            .scene_mut(id)
            .ok_or_else(|| StoryboardError::SceneNotFound(id.to_string()))?;
        scene.prompt = prompt.into();
        scene.duration_secs = clamp_duration(duration_secs);
        scene.style = style.into();
        Ok(())
    }

    pub fn remove_scene(&mut self, id: &str) -> Result<Scene, StoryboardError> {
        let index = self
            .scenes
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| StoryboardError::SceneNotFound(id.to_string()))?;
        Ok(self.scenes.remove(index))
    }

    /// Moves the scene at `from` to position `to`, shifting the rest.
    pub fn move_scene(&mut self, from: usize, to: usize) -> Result<(), StoryboardError> {
        if from >= self.scenes.len() {
            return Err(StoryboardError::IndexOutOfRange(from));
        }
        if to >= self.scenes.len() {
            return Err(StoryboardError::IndexOutOfRange(to));
        }
        let scene = self.scenes.remove(from);
        self.scenes.insert(to, scene);
        Ok(())
    }

    pub fn attach_voice_over(
        &mut self,
        id: &str,
        text: impl Into<String>,
        audio_url: Option<String>,
        voice_type: Option<String>,
    ) -> Result<(), StoryboardError> {
        let scene = self
            .scene_mut(id)
            .ok_or_else(|| StoryboardError::SceneNotFound(id.to_string()))?;
        scene.voice_over = Some(VoiceOver {
            enabled: true,
            text: text.into(),
            audio_url,
            voice_type,
        });
        Ok(())
    }

    /// Plain sum of scene durations (the value shown in the editor and
    /// persisted on the project).
    pub fn total_duration_secs(&self) -> u32 {
        self.scenes.iter().map(|s| s.duration_secs).sum()
    }

    /// Sum of billed durations (zero durations fall back to the default).
    pub fn billed_duration_secs(&self) -> u32 {
        self.scenes.iter().map(|s| s.billed_duration_secs()).sum()
    }
}
