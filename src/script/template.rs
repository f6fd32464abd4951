use crate::script::model::{Scene, Script};
use crate::script::validate::{ScriptError, ValidationConfig, parse_script};
use std::path::Path;

/// A ready-made prompt for a well-known event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptPreset {
    /// Short label suitable for a title.
    pub description: String,
    /// Full visual prompt.
    pub prompt: String,
}

/// Look up a preset prompt by event key, falling back to a generic cinematic recreation.
pub fn prompt_preset(event: &str) -> PromptPreset {
    let (description, prompt) = match event {
        "declaration_of_independence" => (
            "The signing of the Declaration of Independence",
            "A grand hall in Philadelphia, 1776. The founding fathers gather around a wooden \
             table, signing the Declaration of Independence. Sunlight streams through tall \
             windows. Men in colonial attire stand with quills in hand.",
        ),
        "suffrage_movement" => (
            "Women's suffrage movement march",
            "A march for women's suffrage in the early 1900s. Women in period clothing carry \
             banners demanding voting rights. Historical buildings line the street.",
        ),
        "civil_rights_march" => (
            "The March on Washington",
            "The March on Washington, 1963. A speaker stands at the Lincoln Memorial addressing \
             a vast crowd, the Washington Monument in the background.",
        ),
        other => {
            let event = other.replace('_', " ");
            return PromptPreset {
                description: "Custom historical event".to_string(),
                prompt: format!(
                    "A cinematic recreation of {event} with dramatic lighting and careful \
                     attention to historical detail."
                ),
            };
        }
    };
    PromptPreset {
        description: description.to_string(),
        prompt: prompt.to_string(),
    }
}

/// The four-beat, 60 second template: hook, context, impact and call to action.
pub fn create_script_template() -> Script {
    let beats = [
        (
            "Cinematic establishing shot of the historical setting",
            "Hook: an engaging opening question",
            "intro",
        ),
        (
            "Historical recreation of the event as it unfolds",
            "Context: what happened and why",
            "narration",
        ),
        (
            "Modern scene connecting the event to life today",
            "Impact: why it still matters",
            "shift",
        ),
        (
            "Bold closing shot with space for on-screen text",
            "What would you have done? Share below",
            "outro",
        ),
    ];
    let scenes = beats
        .iter()
        .enumerate()
        .map(|(index, (description, overlay, cue))| Scene {
            index,
            description: (*description).to_string(),
            duration_seconds: 15.0,
            overlay_text: Some((*overlay).to_string()),
            audio_cue: Some((*cue).to_string()),
        })
        .collect();

    Script {
        title: "Template: historical event".to_string(),
        description: "A 60-second story about a historical event and its impact today."
            .to_string(),
        scenes,
        hashtags: vec![
            "#AmericanHistory".to_string(),
            "#BillOfRights".to_string(),
            "#Education".to_string(),
        ],
        call_to_action: Some("Follow for the next chapter".to_string()),
        target_audience: Some("13-18".to_string()),
        target_duration_secs: Some(60.0),
    }
}

/// Read and validate a script file.
pub fn load_script(path: impl AsRef<Path>, cfg: &ValidationConfig) -> Result<Script, ScriptError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ScriptError::Io(format!("read script '{}': {e}", path.display())))?;
    parse_script(&text, cfg)
}

/// Write a script as pretty JSON, creating parent directories.
pub fn save_script(script: &Script, path: impl AsRef<Path>) -> Result<(), ScriptError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            ScriptError::Io(format!("create directory '{}': {e}", parent.display()))
        })?;
    }
    let json = script
        .to_json_pretty()
        .map_err(|e| ScriptError::Parse(e.to_string()))?;
    std::fs::write(path, json)
        .map_err(|e| ScriptError::Io(format!("write script '{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/script/template.rs"]
mod tests;
