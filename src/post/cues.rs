use std::path::{Path, PathBuf};

use crate::assemble::{AssembledTimeline, SceneRange};
use crate::assets::media::{AudioPcm, load_audio};
use crate::foundation::error::{ReelError, ReelResult};
use crate::post::audio::{AudioAnchor, AudioTrack};
use crate::post::error::PostProcessError;
use crate::post::processor::PostConfig;
use crate::script::Script;

/// File extensions tried, in order, when resolving a cue.
pub const CUE_EXTENSIONS: [&str; 5] = ["wav", "mp3", "ogg", "flac", "m4a"];

/// Maps a scene's `audio_cue` name to samples.
pub trait AudioCueResolver: Send + Sync + std::fmt::Debug {
    /// Load the audio for `cue`.
    fn resolve(&self, cue: &str) -> ReelResult<AudioPcm>;
}

/// Resolves `<dir>/<cue>.<ext>` for the extensions in [`CUE_EXTENSIONS`].
#[derive(Clone, Debug)]
pub struct DirCueResolver {
    dir: PathBuf,
}

impl DirCueResolver {
    /// Resolver over `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory searched.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First existing file for `cue`, if any.
    pub fn find(&self, cue: &str) -> ReelResult<Option<PathBuf>> {
        let cue = cue.trim();
        if cue.is_empty()
            || cue.contains(['/', '\\'])
            || cue.contains("..")
            || cue.starts_with('.')
        {
            return Err(ReelError::validation(format!(
                "audio cue '{cue}' is not a plain file name"
            )));
        }
        Ok(CUE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{cue}.{ext}")))
            .find(|p| p.is_file()))
    }
}

impl AudioCueResolver for DirCueResolver {
    fn resolve(&self, cue: &str) -> ReelResult<AudioPcm> {
        let path = self.find(cue)?.ok_or_else(|| {
            ReelError::validation(format!(
                "no {} file for cue '{cue}' in '{}'",
                CUE_EXTENSIONS.join("/"),
                self.dir.display()
            ))
        })?;
        load_audio(&path)
    }
}

/// A configured narration or music bed.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackSource {
    /// Audio file (WAV natively; other formats need `media-ffmpeg`).
    pub path: PathBuf,
    /// Linear gain.
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Start time on the timeline.
    #[serde(default)]
    pub start_secs: f64,
}

fn default_gain() -> f32 {
    1.0
}

/// Audio layers implied by a script and configuration.
///
/// Scene cues become tracks anchored to their scene; narration and music are timeline-anchored.
/// Anything that cannot be loaded is reported and skipped.
pub fn plan_audio(
    script: &Script,
    timeline: &AssembledTimeline,
    cfg: &PostConfig,
    resolver: Option<&dyn AudioCueResolver>,
) -> (Vec<AudioTrack>, Vec<PostProcessError>) {
    let mut tracks = Vec::new();
    let mut issues = Vec::new();

    for scene in script.scenes() {
        let Some(cue) = scene.audio_cue.as_deref().map(str::trim) else {
            continue;
        };
        if cue.is_empty() {
            continue;
        }
        let anchor = SceneRange::single(scene.index);
        if !timeline.contains_range(anchor) {
            issues.push(PostProcessError::InvalidAnchor {
                layer: format!("audio cue '{cue}'"),
                anchor,
                scenes: timeline.scene_count(),
            });
            continue;
        }
        let resolved = match resolver {
            Some(r) => r.resolve(cue).map_err(|e| e.to_string()),
            None => Err("no audio directory configured".to_string()),
        };
        match resolved {
            Ok(pcm) => tracks.push(AudioTrack {
                label: format!("cue:{cue}"),
                pcm,
                gain: cfg.cue_gain,
                anchor: AudioAnchor::Scenes(anchor),
            }),
            Err(detail) => {
                tracing::warn!(scene_index = scene.index, cue, %detail, "audio cue skipped");
                issues.push(PostProcessError::Cue {
                    scene_index: scene.index,
                    cue: cue.to_string(),
                    detail,
                });
            }
        }
    }

    for (label, source) in [("narration", &cfg.narration), ("music", &cfg.music)] {
        let Some(source) = source else {
            continue;
        };
        match load_audio(&source.path) {
            Ok(pcm) => tracks.push(AudioTrack {
                label: label.to_string(),
                pcm,
                gain: source.gain,
                anchor: AudioAnchor::Timeline {
                    start_secs: source.start_secs,
                },
            }),
            Err(e) => {
                tracing::warn!(track = label, error = %e, "audio source skipped");
                issues.push(PostProcessError::Audio {
                    label: label.to_string(),
                    detail: e.to_string(),
                });
            }
        }
    }

    (tracks, issues)
}

#[cfg(test)]
#[path = "../../tests/unit/post/cues.rs"]
mod tests;
