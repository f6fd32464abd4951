use std::ops::Range;
use std::sync::Arc;

use crate::foundation::core::{Fps, FrameRGBA};

/// Inclusive range of scene indices a layer is anchored to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SceneRange {
    /// First scene (inclusive).
    pub start: usize,
    /// Last scene (inclusive).
    pub end: usize,
}

impl SceneRange {
    /// Range covering `start..=end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Range covering exactly one scene.
    pub fn single(scene: usize) -> Self {
        Self::new(scene, scene)
    }

    /// Whether `scene` falls within the range.
    pub fn contains(&self, scene: usize) -> bool {
        self.start <= scene && scene <= self.end
    }
}

impl std::fmt::Display for SceneRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "scene {}", self.start)
        } else {
            write!(f, "scenes {}..={}", self.start, self.end)
        }
    }
}

/// One scene's frames placed on the shared time axis.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineClip {
    /// Scene this clip renders.
    pub scene_index: usize,
    /// Output frames at `target_frame_rate`; frames may be shared between positions.
    pub frames: Vec<Arc<FrameRGBA>>,
    /// Output frame rate (the timeline rate).
    pub target_frame_rate: Fps,
    /// Cumulative duration of all preceding clips.
    pub start_offset_seconds: f64,
    /// First global frame index of this clip.
    pub start_frame: u64,
}

impl TimelineClip {
    /// Number of output frames.
    pub fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    /// One past the last global frame index.
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.frame_count()
    }

    /// Duration on the timeline in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.target_frame_rate.frames_to_secs(self.frame_count())
    }

    /// Global frame indices covered by this clip.
    pub fn frame_range(&self) -> Range<u64> {
        self.start_frame..self.end_frame()
    }

    /// Frame dimensions, if the clip has frames.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| (f.width, f.height))
    }
}

/// Scene clips laid end to end at a single frame rate.
///
/// Clips are ordered by scene index and contiguous: clip `i` starts on the frame after clip
/// `i - 1` ends.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledTimeline {
    /// Timeline frame rate.
    pub fps: Fps,
    /// Clips in scene order.
    pub clips: Vec<TimelineClip>,
    /// Sum of clip durations.
    pub total_duration_seconds: f64,
}

impl AssembledTimeline {
    /// Total number of frames.
    pub fn total_frames(&self) -> u64 {
        self.clips.last().map(TimelineClip::end_frame).unwrap_or(0)
    }

    /// Number of scenes on the timeline.
    pub fn scene_count(&self) -> usize {
        self.clips.len()
    }

    /// Map a global frame to `(clip position, local frame)`.
    pub fn locate(&self, frame: u64) -> Option<(usize, usize)> {
        if frame >= self.total_frames() {
            return None;
        }
        let pos = self
            .clips
            .partition_point(|c| c.end_frame() <= frame);
        let clip = self.clips.get(pos)?;
        Some((pos, (frame - clip.start_frame) as usize))
    }

    /// Frame shown at global index `frame`.
    pub fn frame(&self, frame: u64) -> Option<&Arc<FrameRGBA>> {
        let (pos, local) = self.locate(frame)?;
        self.clips[pos].frames.get(local)
    }

    /// Clip rendering `scene_index`.
    pub fn clip_for_scene(&self, scene_index: usize) -> Option<&TimelineClip> {
        self.clips.iter().find(|c| c.scene_index == scene_index)
    }

    /// Whether every scene of `range` is on the timeline.
    pub fn contains_range(&self, range: SceneRange) -> bool {
        range.start <= range.end && range.end < self.clips.len()
    }

    /// Global frames covered by `range`, if valid.
    pub fn frames_for_range(&self, range: SceneRange) -> Option<Range<u64>> {
        if !self.contains_range(range) {
            return None;
        }
        Some(self.clips[range.start].start_frame..self.clips[range.end].end_frame())
    }

    /// Time span in seconds covered by `range`, if valid.
    pub fn secs_for_range(&self, range: SceneRange) -> Option<Range<f64>> {
        let frames = self.frames_for_range(range)?;
        Some(self.fps.frames_to_secs(frames.start)..self.fps.frames_to_secs(frames.end))
    }
}
