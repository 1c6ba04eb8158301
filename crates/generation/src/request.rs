use crate::GenerationError;
use serde::{Deserialize, Serialize};
use storyboard::Scene;

pub const QUALITY_STANDARD: &str = "standard";

/// Sentinel scene id when the first scene has no id of its own.
const COMBINED_SCENE_ID: &str = "combined";

/// Sentinel project id for unsaved sessions.
pub const TEMP_PROJECT_ID: &str = "temp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSettings {
    pub enabled: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
}

impl CaptionSettings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            kind: None,
            font_size: None,
        }
    }

    pub fn enabled(kind: impl Into<String>, font_size: impl Into<String>) -> Self {
        Self {
            enabled: true,
            kind: Some(kind.into()),
            font_size: Some(font_size.into()),
        }
    }
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self::disabled()
    }
}

/// One rendering request covering the whole storyboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoRequest {
    pub scene_id: String,
    pub project_id: String,
    pub prompt: String,
    pub quality: String,
    pub duration: u32,
    pub style: String,
    pub captions: CaptionSettings,
    pub background_music: bool,
}

impl GenerateVideoRequest {
    /// Builds the request for a non-empty scene sequence. The prompt keeps
    /// every scene's index, duration, style and text in sequence order; the
    /// billed duration substitutes the default for zero durations.
    pub fn build(
        scenes: &[Scene],
        style_name: &str,
        project_id: Option<&str>,
        captions: CaptionSettings,
        background_music: bool,
    ) -> Result<Self, GenerationError> {
        if scenes.is_empty() {
            return Err(GenerationError::EmptyStoryboard);
        }
        Ok(Self {
            scene_id: scenes
                .first()
                .map(|s| s.id.clone())
                .unwrap_or_else(|| COMBINED_SCENE_ID.to_string()),
            project_id: project_id.unwrap_or(TEMP_PROJECT_ID).to_string(),
            prompt: combined_prompt(style_name, scenes),
            quality: QUALITY_STANDARD.to_string(),
            duration: scenes.iter().map(|s| s.billed_duration_secs()).sum(),
            style: style_name.to_string(),
            captions,
            background_music,
        })
    }
}

/// Concatenates all scene descriptions into one prompt, prefixed by the
/// overall style label.
pub fn combined_prompt(style_name: &str, scenes: &[Scene]) -> String {
    let body = scenes
        .iter()
        .enumerate()
        .map(|(idx, scene)| {
            format!(
                "Scene {} ({}s, {} style): {}",
                idx + 1,
                scene.duration_secs,
                scene.style,
                scene.prompt
            )
        })
        .collect::<Vec<_>>()
        .join(". ");
    format!("Overall Style: {style_name}. {body}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceoverRequest {
    pub scene_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyboard::Storyboard;

    fn board() -> Storyboard {
        let mut board = Storyboard::new();
        board.add_scene("a sunrise over the bay", 10, "cinematic");
        board.add_scene("waves crash on rocks", 15, "documentary");
        board.add_scene("gulls wheel overhead", 5, "cinematic");
        board
    }

    #[test]
    fn test_combined_prompt_keeps_every_scene_in_order() {
        let board = board();
        let prompt = combined_prompt("Cinematic", &board.scenes);

        assert!(prompt.starts_with("Overall Style: Cinematic. "));
        let first = prompt.find("Scene 1 (10s, cinematic style): a sunrise over the bay");
        let second = prompt.find("Scene 2 (15s, documentary style): waves crash on rocks");
        let third = prompt.find("Scene 3 (5s, cinematic style): gulls wheel overhead");
        assert!(first.is_some() && second.is_some() && third.is_some());
        assert!(first < second && second < third);
    }

    #[test]
    fn test_build_rejects_empty_storyboard() {
        let result =
            GenerateVideoRequest::build(&[], "Cinematic", None, CaptionSettings::disabled(), false);
        assert!(matches!(result, Err(GenerationError::EmptyStoryboard)));
    }

    #[test]
    fn test_build_sums_billed_durations() {
        let mut board = board();
        let mut zero = Scene::new("late addition", 10, "cinematic");
        zero.duration_secs = 0;
        board.scenes.push(zero);

        let request = GenerateVideoRequest::build(
            &board.scenes,
            "Cinematic",
            None,
            CaptionSettings::disabled(),
            false,
        )
        .unwrap();
        assert_eq!(request.duration, 35);
    }

    #[test]
    fn test_build_uses_sentinels_when_unsaved() {
        let board = board();
        let request = GenerateVideoRequest::build(
            &board.scenes,
            "Cinematic",
            None,
            CaptionSettings::disabled(),
            false,
        )
        .unwrap();
        assert_eq!(request.project_id, "temp");
        assert_eq!(request.scene_id, board.scenes[0].id);
        assert_eq!(request.quality, "standard");
    }

    #[test]
    fn test_caption_serialization() {
        let disabled = serde_json::to_value(CaptionSettings::disabled()).unwrap();
        assert_eq!(disabled, serde_json::json!({ "enabled": false }));

        let enabled = serde_json::to_value(CaptionSettings::enabled("standard", "medium")).unwrap();
        assert_eq!(
            enabled,
            serde_json::json!({ "enabled": true, "type": "standard", "fontSize": "medium" })
        );
    }

    #[test]
    fn test_request_serialization_shape() {
        let board = board();
        let request = GenerateVideoRequest::build(
            &board.scenes,
            "Cinematic",
            Some("507f1f77bcf86cd799439011"),
            CaptionSettings::enabled("standard", "medium"),
            true,
        )
        .unwrap();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["projectId"], "507f1f77bcf86cd799439011");
        assert_eq!(json["backgroundMusic"], true);
        assert_eq!(json["captions"]["fontSize"], "medium");
        assert_eq!(json["duration"], 30);
    }
}
