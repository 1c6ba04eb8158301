use std::collections::HashMap;

use storyboard::{audio_track_id, AudioTrack, Scene};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("clip failed to start: {0}")]
    StartRejected(String),
}

/// Narration drift beyond this is corrected by seeking without restarting.
pub const DRIFT_TOLERANCE_SECS: f64 = 0.3;

/// The media-element seam. Implementations wrap whatever actually produces
/// sound (a browser audio element, a native sink, a test double).
pub trait AudioClip {
    fn current_time(&self) -> f64;
    fn is_paused(&self) -> bool;
    fn is_ended(&self) -> bool;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn seek(&mut self, secs: f64);
}

/// Owned pool of audio clips keyed by derived track id. Creation is
/// idempotent per key; removal and disposal pause the clip before releasing
/// it so nothing keeps playing after its track is gone.
pub struct AudioPool<C: AudioClip> {
    media_host: String,
    make: Box<dyn Fn(&str) -> C + Send>,
    clips: HashMap<String, C>,
}

impl<C: AudioClip> AudioPool<C> {
    pub fn new(media_host: impl Into<String>, make: impl Fn(&str) -> C + Send + 'static) -> Self {
        Self {
            media_host: media_host.into(),
            make: Box::new(make),
            clips: HashMap::new(),
        }
    }

    /// Absolute URLs are used verbatim; relative paths resolve against the
    /// local media host.
    pub fn resolve_url(&self, raw: &str) -> String {
        if raw.starts_with("http") {
            raw.to_string()
        } else {
            format!("{}{}", self.media_host, raw)
        }
    }

    /// Get-or-create for a track's clip. Must run before any play/pause/seek
    /// attempt on that key.
    pub fn ensure(&mut self, track: &AudioTrack) -> &mut C {
        let url = self.resolve_url(&track.audio_url);
        self.clips
            .entry(track.id.clone())
            .or_insert_with(|| (self.make)(&url))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut C> {
        self.clips.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clips.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Pauses and releases one clip. Runs before the owning track is
    /// considered deleted.
    pub fn remove(&mut self, id: &str) {
        if let Some(mut clip) = self.clips.remove(id) {
            clip.pause();
        }
    }

    /// Pauses and releases everything; used on view disposal.
    pub fn clear(&mut self) {
        for clip in self.clips.values_mut() {
            clip.pause();
        }
        self.clips.clear();
    }

    fn pause_and_rewind_others(&mut self, keep_id: &str) {
        for (id, clip) in self.clips.iter_mut() {
            if id != keep_id {
                clip.pause();
                clip.seek(0.0);
            }
        }
    }
}

/// Keeps per-scene narration aligned with the video playhead. Runs on every
/// playback event (timeupdate/play/pause/seeked), never on its own timer.
///
/// Scenes are evaluated in sequence order with a running cumulative-time
/// accumulator, so windows are contiguous and at most one scene is active.
pub fn sync_playback<C: AudioClip>(
    scenes: &[Scene],
    video_time: f64,
    video_paused: bool,
    pool: &mut AudioPool<C>,
) {
    let mut cursor = 0.0f64;
    for scene in scenes {
        let start = cursor;
        let end = cursor + scene.duration_secs as f64;
        if let Some(clip) = pool.get_mut(&audio_track_id(&scene.id)) {
            if video_paused {
                clip.pause();
            } else if video_time >= start && video_time < end {
                let target = (video_time - start).max(0.0);
                if clip.is_paused() && !clip.is_ended() {
                    clip.seek(target);
                    if let Err(err) = clip.play() {
                        log::error!("audio play failed for scene {}: {err}", scene.id);
                    }
                } else if clip.is_ended() {
                    // ended while still inside the window: replay from the
                    // correct offset instead of staying silent
                    clip.seek(target);
                    if let Err(err) = clip.play() {
                        log::error!("audio play failed for scene {}: {err}", scene.id);
                    }
                } else if (clip.current_time() - target).abs() > DRIFT_TOLERANCE_SECS {
                    clip.seek(target);
                }
            } else if !clip.is_paused() {
                // narration never bleeds into adjacent scenes
                clip.pause();
                clip.seek(0.0);
            }
        }
        cursor = end;
    }
}

/// Manual per-track play/pause from the timeline, exclusive across tracks.
#[derive(Debug, Default)]
pub struct ManualPlayback {
    playing: Option<String>,
}

impl ManualPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(&self) -> Option<&str> {
        self.playing.as_deref()
    }

    /// Toggles a track. Starting one pauses and rewinds every other clip;
    /// replay always starts at 0.
    pub fn toggle<C: AudioClip>(
        &mut self,
        pool: &mut AudioPool<C>,
        track: &AudioTrack,
    ) -> Result<(), PlaybackError> {
        if self.playing.as_deref() == Some(track.id.as_str()) {
            if let Some(clip) = pool.get_mut(&track.id) {
                clip.pause();
            }
            self.playing = None;
            return Ok(());
        }

        pool.ensure(track);
        pool.pause_and_rewind_others(&track.id);
        let clip = match pool.get_mut(&track.id) {
            Some(clip) => clip,
            None => return Ok(()),
        };
        clip.seek(0.0);
        match clip.play() {
            Ok(()) => {
                self.playing = Some(track.id.clone());
                Ok(())
            }
            Err(err) => {
                self.playing = None;
                Err(err)
            }
        }
    }

    /// Called when a clip's natural end is observed.
    pub fn note_ended(&mut self, track_id: &str) {
        if self.playing.as_deref() == Some(track_id) {
            self.playing = None;
        }
    }
}
