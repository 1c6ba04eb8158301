use serde::{Deserialize, Serialize};

pub const DEFAULT_PRESET_ID: &str = "1";

/// Visual style applied to the whole video; scene styles refine it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylePreset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub thumbnail: String,
}

impl StylePreset {
    fn new(id: &str, name: &str, description: &str, thumbnail: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            thumbnail: thumbnail.to_string(),
        }
    }
}

/// The built-in preset catalog, in display order.
pub fn builtin_presets() -> Vec<StylePreset> {
    vec![
        StylePreset::new("1", "Cinematic", "Hollywood-style dramatic scenes", "🎬"),
        StylePreset::new("2", "Documentary", "Professional real-world footage", "📹"),
        StylePreset::new("3", "Animated", "Cartoon and motion graphics", "🎨"),
        StylePreset::new("4", "Tech Demo", "Clean, modern technology showcase", "💻"),
        StylePreset::new("5", "Educational", "Clear instructional style", "📚"),
        StylePreset::new("6", "Commercial", "Product and brand advertising", "🎯"),
    ]
}

/// Resolves a preset id to its display name; unknown ids fall back to the
/// default preset's name.
pub fn preset_name(id: &str) -> String {
    let presets = builtin_presets();
    presets
        .iter()
        .find(|p| p.id == id)
        .or_else(|| presets.iter().find(|p| p.id == DEFAULT_PRESET_ID))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "Cinematic".to_string())
}
