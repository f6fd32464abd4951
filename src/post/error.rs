use crate::assemble::SceneRange;

/// Overlay, transition and audio problems.
///
/// These never fail a run: the affected layer is dropped and the error is recorded on the
/// composited timeline.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PostProcessError {
    /// Overlay text contains characters the caption renderer refuses.
    #[error("unsupported characters in overlay text: {chars:?}")]
    UnsupportedCharacters {
        /// The offending characters, deduplicated.
        chars: String,
    },
    /// No font could be loaded to draw text.
    #[error("no font available for overlay text")]
    FontUnavailable,
    /// SVG construction, parsing or rasterization failed.
    #[error("overlay render failed: {0}")]
    Render(String),
    /// A layer references scenes that are not on the timeline.
    #[error("{layer} is anchored to {anchor} but the timeline has {scenes} scene(s)")]
    InvalidAnchor {
        /// Layer description.
        layer: String,
        /// Requested anchor.
        anchor: SceneRange,
        /// Scenes on the timeline.
        scenes: usize,
    },
    /// An overlay layer was dropped.
    #[error("overlay on {anchor} dropped: {cause}")]
    Overlay {
        /// Anchor of the dropped layer.
        anchor: SceneRange,
        /// Why it was dropped.
        cause: Box<PostProcessError>,
    },
    /// A scene boundary fell back to a hard cut.
    #[error("transition after scene {scene_index} replaced by a cut: {detail}")]
    Transition {
        /// Outgoing scene.
        scene_index: usize,
        /// Why.
        detail: String,
    },
    /// An audio track was dropped.
    #[error("audio track '{label}' dropped: {detail}")]
    Audio {
        /// Track label.
        label: String,
        /// Why.
        detail: String,
    },
    /// A scene's audio cue could not be resolved.
    #[error("audio cue '{cue}' for scene {scene_index} unavailable: {detail}")]
    Cue {
        /// Scene declaring the cue.
        scene_index: usize,
        /// Cue name.
        cue: String,
        /// Why.
        detail: String,
    },
    /// Pixel buffers disagree in size.
    #[error("composite failed: {0}")]
    Composite(String),
}
