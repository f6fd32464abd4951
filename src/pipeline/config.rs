use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::assemble::AssemblyConfig;
use crate::export::TargetSpec;
use crate::foundation::error::{ReelError, ReelResult};
use crate::generate::{GenerationConfig, StyleConfig};
use crate::post::PostConfig;
use crate::script::ValidationConfig;

/// Every setting of a run.
///
/// Each section defaults independently, so a JSON file only needs the keys it changes.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Script duration policy.
    pub validation: ValidationConfig,
    /// Retry, timeout and concurrency for scene generation.
    pub generation: GenerationConfig,
    /// Visual style sent to the model.
    pub style: StyleConfig,
    /// Timeline frame rate and clip extension.
    pub assembly: AssemblyConfig,
    /// Captions, transitions and audio.
    pub post: PostConfig,
    /// Delivery target.
    pub export: TargetSpec,
    /// Abort on the first scene failure instead of substituting placeholders.
    pub fail_fast: bool,
    /// Cancel the whole run after this many seconds.
    pub run_timeout_secs: Option<f64>,
    /// Cache generated clips here.
    pub cache_dir: Option<PathBuf>,
    /// Directory searched for scene audio cues.
    pub audio_dir: Option<PathBuf>,
    /// Colour of placeholder clips substituted for failed scenes.
    pub placeholder_colour: [u8; 3],
}

impl PipelineConfig {
    /// Load a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| ReelError::serde(format!("config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every section.
    pub fn validate(&self) -> ReelResult<()> {
        self.validation.validate().map_err(ReelError::validation)?;
        self.generation.validate().map_err(ReelError::validation)?;
        self.style.validate().map_err(ReelError::validation)?;
        self.assembly.validate().map_err(ReelError::validation)?;
        self.post.validate().map_err(ReelError::validation)?;
        self.export
            .validate()
            .map_err(|e| ReelError::validation(format!("export: {e}")))?;
        if let Some(t) = self.run_timeout_secs
            && !(t.is_finite() && t > 0.0)
        {
            return Err(ReelError::validation(
                "run_timeout_secs must be a positive number",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/config.rs"]
mod tests;
