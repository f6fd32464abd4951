use std::sync::Arc;

use crate::assemble::timeline::{AssembledTimeline, TimelineClip};
use crate::foundation::core::{Fps, FrameRGBA};
use crate::generate::{RawClip, StyleConfig};
use crate::script::Script;

// Absorbs float error when a frame time lands exactly on a source frame boundary.
const SAMPLE_EPS: f64 = 1e-6;

/// What to show once a clip shorter than its scene runs out of frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtendPolicy {
    /// Start again from the first frame.
    #[default]
    Loop,
    /// Freeze on the last frame.
    Hold,
}

/// Assembly settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Timeline frame rate.
    pub fps: Fps,
    /// Policy for clips shorter than their scene.
    pub extend_policy: ExtendPolicy,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            extend_policy: ExtendPolicy::Loop,
        }
    }
}

impl AssemblyConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err("assembly.fps must have non-zero num and den".to_string());
        }
        Ok(())
    }
}

/// Assembly invariant violations. These indicate a caller or generator bug and are fatal.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AssemblyError {
    /// A raw clip has no frames.
    #[error("scene {scene_index} has an empty clip")]
    EmptyClip {
        /// Offending scene.
        scene_index: usize,
    },
    /// No clip was supplied for a declared scene.
    #[error("no clip supplied for scene {scene_index}")]
    MissingClip {
        /// Scene without a clip.
        scene_index: usize,
    },
    /// Clips are not in scene order.
    #[error("clip at position {position} belongs to scene {found}, expected scene {expected}")]
    OutOfOrder {
        /// Position in the supplied list.
        position: usize,
        /// Scene expected at that position.
        expected: usize,
        /// Scene the clip declares.
        found: usize,
    },
    /// More clips than scenes.
    #[error("{found} clips supplied for {expected} scenes")]
    ClipCount {
        /// Number of scenes.
        expected: usize,
        /// Number of clips.
        found: usize,
    },
    /// Native frame rate is not a positive finite number.
    #[error("scene {scene_index} has invalid native frame rate {rate}")]
    BadFrameRate {
        /// Offending scene.
        scene_index: usize,
        /// Reported rate.
        rate: f64,
    },
    /// Frames of one clip differ in size or have malformed buffers.
    #[error("scene {scene_index} has inconsistent frames: {detail}")]
    InconsistentFrames {
        /// Offending scene.
        scene_index: usize,
        /// What was wrong.
        detail: String,
    },
}

/// Builds an [`AssembledTimeline`] from one raw clip per scene.
#[derive(Clone, Debug, Default)]
pub struct ClipAssembler {
    cfg: AssemblyConfig,
}

impl ClipAssembler {
    /// Assembler using `cfg`.
    pub fn new(cfg: AssemblyConfig) -> Self {
        Self { cfg }
    }

    /// Settings in use.
    pub fn config(&self) -> &AssemblyConfig {
        &self.cfg
    }

    /// Place `clips` (one per scene, in scene order) on a timeline.
    ///
    /// Scene boundaries are rounded cumulatively so the total frame count is the declared total
    /// duration rounded to the nearest frame, regardless of how individual scenes round.
    #[tracing::instrument(skip_all, fields(scenes = script.len()))]
    pub fn assemble(
        &self,
        script: &Script,
        clips: &[RawClip],
    ) -> Result<AssembledTimeline, AssemblyError> {
        let scenes = script.scenes();
        if clips.len() > scenes.len() {
            return Err(AssemblyError::ClipCount {
                expected: scenes.len(),
                found: clips.len(),
            });
        }

        let fps = self.cfg.fps;
        let mut out = Vec::with_capacity(scenes.len());
        let mut cum_secs = 0.0;
        for (position, scene) in scenes.iter().enumerate() {
            let raw = clips.get(position).ok_or(AssemblyError::MissingClip {
                scene_index: scene.index,
            })?;
            if raw.scene_index != scene.index {
                return Err(AssemblyError::OutOfOrder {
                    position,
                    expected: scene.index,
                    found: raw.scene_index,
                });
            }
            check_clip(raw)?;

            let start_frame = fps.secs_to_frames_round(cum_secs);
            cum_secs += scene.duration_seconds;
            let end_frame = fps.secs_to_frames_round(cum_secs);
            let count = end_frame.saturating_sub(start_frame);

            let frames = (0..count)
                .map(|k| Arc::clone(&raw.frames[self.source_index(k, raw)]))
                .collect::<Vec<_>>();
            if (count as usize) > raw.frames.len() {
                tracing::debug!(
                    scene_index = scene.index,
                    policy = ?self.cfg.extend_policy,
                    "extending short clip"
                );
            }

            out.push(TimelineClip {
                scene_index: scene.index,
                frames,
                target_frame_rate: fps,
                start_offset_seconds: fps.frames_to_secs(start_frame),
                start_frame,
            });
        }

        let total_frames = out.last().map(TimelineClip::end_frame).unwrap_or(0);
        Ok(AssembledTimeline {
            fps,
            clips: out,
            total_duration_seconds: fps.frames_to_secs(total_frames),
        })
    }

    /// Source frame shown at local output frame `k`.
    fn source_index(&self, k: u64, raw: &RawClip) -> usize {
        let n = raw.frames.len();
        let t = self.cfg.fps.frames_to_secs(k);
        let s = (t * raw.native_frame_rate + SAMPLE_EPS).floor().max(0.0) as usize;
        if s < n {
            return s;
        }
        match self.cfg.extend_policy {
            ExtendPolicy::Loop => s % n,
            ExtendPolicy::Hold => n - 1,
        }
    }
}

fn check_clip(raw: &RawClip) -> Result<(), AssemblyError> {
    let scene_index = raw.scene_index;
    let Some(first) = raw.frames.first() else {
        return Err(AssemblyError::EmptyClip { scene_index });
    };
    if !raw.native_frame_rate.is_finite() || raw.native_frame_rate <= 0.0 {
        return Err(AssemblyError::BadFrameRate {
            scene_index,
            rate: raw.native_frame_rate,
        });
    }
    for (i, frame) in raw.frames.iter().enumerate() {
        if !frame.same_size(first) {
            return Err(AssemblyError::InconsistentFrames {
                scene_index,
                detail: format!(
                    "frame {i} is {}x{}, frame 0 is {}x{}",
                    frame.width, frame.height, first.width, first.height
                ),
            });
        }
        if let Err(e) = frame.validate() {
            return Err(AssemblyError::InconsistentFrames {
                scene_index,
                detail: format!("frame {i}: {e}"),
            });
        }
    }
    Ok(())
}

/// A one-frame solid clip standing in for a scene that could not be generated.
///
/// Sized like generated clips under `style`; assembly holds it for the scene's full duration.
pub fn placeholder_clip(scene_index: usize, style: &StyleConfig, colour: [u8; 3]) -> RawClip {
    RawClip {
        scene_index,
        frames: vec![Arc::new(FrameRGBA::solid(
            style.width.max(1),
            style.height.max(1),
            colour,
        ))],
        native_frame_rate: f64::from(style.fps.max(1)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/assembler.rs"]
mod tests;
