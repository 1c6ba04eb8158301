use crate::{Scene, StoryboardError};
use serde::{Deserialize, Serialize};

/// Narration clip positioned on the timeline by cumulative scene durations.
/// Derived from the scene sequence, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub id: String,
    pub scene_id: String,
    pub audio_url: String,
    pub text: String,
    pub start_secs: f64,
    pub duration_secs: f64,
}

pub fn audio_track_id(scene_id: &str) -> String {
    format!("audio-{scene_id}")
}

/// Wholesale recomputation of the audio-track list. A track exists only for
/// scenes with an enabled voice-over and a resolved audio URL; start offsets
/// accumulate over every preceding scene, voiced or not.
pub fn derive_tracks(scenes: &[Scene]) -> Vec<AudioTrack> {
    let mut tracks = Vec::new();
    let mut cursor = 0.0f64;
    for scene in scenes {
        if let Some(vo) = &scene.voice_over {
            if vo.enabled {
                if let Some(url) = &vo.audio_url {
                    tracks.push(AudioTrack {
                        id: audio_track_id(&scene.id),
                        scene_id: scene.id.clone(),
                        audio_url: url.clone(),
                        text: vo.text.clone(),
                        start_secs: cursor,
                        duration_secs: scene.duration_secs as f64,
                    });
                }
            }
        }
        cursor += scene.duration_secs as f64;
    }
    tracks
}

/// Track list plus transient manual start overrides. A manual move is a
/// visual override only: the next scene-driven rebuild discards it.
#[derive(Debug, Default)]
pub struct TrackBoard {
    tracks: Vec<AudioTrack>,
    moved: Vec<String>,
}

impl TrackBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    pub fn track(&self, id: &str) -> Option<&AudioTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Recomputes all tracks from the scene sequence. Manual offsets do not
    /// survive this.
    pub fn rebuild(&mut self, scenes: &[Scene]) {
        if !self.moved.is_empty() {
            log::debug!(
                "discarding {} manual track offset(s) on rebuild",
                self.moved.len()
            );
            self.moved.clear();
        }
        self.tracks = derive_tracks(scenes);
    }

    /// Transient visual override of a track's start time.
    pub fn move_track(&mut self, id: &str, start_secs: f64) -> Result<(), StoryboardError> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoryboardError::TrackNotFound(id.to_string()))?;
        track.start_secs = start_secs.max(0.0);
        self.moved.push(id.to_string());
        Ok(())
    }

    /// Drops a track from the board; the caller is responsible for releasing
    /// any playback resources keyed by the track id.
    pub fn remove_track(&mut self, id: &str) -> Result<AudioTrack, StoryboardError> {
        let index = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoryboardError::TrackNotFound(id.to_string()))?;
        self.moved.retain(|m| m != id);
        Ok(self.tracks.remove(index))
    }
}
