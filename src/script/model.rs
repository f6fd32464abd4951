use crate::generate::StyleConfig;

/// One narrative beat: a prompt for the generative model and a target duration.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Scene {
    /// 0-based position in the script; sequence order is significant.
    pub index: usize,
    /// Non-empty (trimmed) description used as the generation prompt.
    pub description: String,
    /// Requested on-screen duration, always `> 0`.
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    /// Caption rendered over this scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_text: Option<String>,
    /// Name of an audio cue played during this scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_cue: Option<String>,
}

impl Scene {
    /// Build the generation prompt for this scene under `style`.
    pub fn prompt(&self, style: &StyleConfig) -> String {
        let style_name = style.style.trim();
        if style_name.is_empty() {
            return self.description.clone();
        }
        format!(
            "{}. {style_name} style, portrait composition, careful attention to period detail.",
            self.description.trim_end_matches('.')
        )
    }
}

/// A validated script.
///
/// Only [`crate::validate_script`] (and the template helpers built on it) construct scripts, so
/// holding a `Script` means the structural invariants hold: at least one scene, contiguous
/// indices, positive durations, non-empty descriptions.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Script {
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) scenes: Vec<Scene>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) call_to_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) target_audience: Option<String>,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub(crate) target_duration_secs: Option<f64>,
}

impl Script {
    /// Script title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Free-form description (may be empty).
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Scenes in playback order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Scene at `index`, if any.
    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    /// Number of scenes (always at least one).
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Always `false` for a validated script; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Hashtags carried for publishing; not used by rendering.
    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }

    /// Closing call to action, rendered on the last scene when enabled.
    pub fn call_to_action(&self) -> Option<&str> {
        self.call_to_action.as_deref()
    }

    /// Intended audience label.
    pub fn target_audience(&self) -> Option<&str> {
        self.target_audience.as_deref()
    }

    /// Per-script target duration overriding the configured one.
    pub fn target_duration_secs(&self) -> Option<f64> {
        self.target_duration_secs
    }

    /// Sum of all scene durations.
    pub fn total_duration_secs(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration_seconds).sum()
    }

    /// Serialize back into the canonical input JSON shape.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
