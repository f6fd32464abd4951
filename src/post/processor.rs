use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

use crate::assemble::{AssembledTimeline, SceneRange};
use crate::foundation::core::{Fps, FrameRGBA};
use crate::foundation::error::ReelResult;
use crate::post::audio::{AudioTrack, MixedAudio, mix_tracks};
use crate::post::composite::over_in_place;
use crate::post::cues::TrackSource;
use crate::post::error::PostProcessError;
use crate::post::overlay::{OverlayRenderer, OverlaySpec, OverlayStyle};
use crate::post::transitions::{
    BoundaryTransition, TransitionKind, TransitionSpec, blend_frames, parse_transition,
    plan_transitions,
};

/// Post-processing settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PostConfig {
    /// Scene boundary transition.
    pub transition: TransitionSpec,
    /// Caption appearance.
    pub overlay_style: OverlayStyle,
    /// Show the script title over the first scene.
    pub title_card: bool,
    /// Show the call to action over the last scene.
    pub call_to_action: bool,
    /// Narration track placed from the start of the timeline.
    pub narration: Option<TrackSource>,
    /// Background music placed from the start of the timeline.
    pub music: Option<TrackSource>,
    /// Gain applied to per-scene audio cues.
    pub cue_gain: f32,
    /// Extra directories searched for caption fonts.
    pub font_dirs: Vec<PathBuf>,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            transition: TransitionSpec::default(),
            overlay_style: OverlayStyle::default(),
            title_card: true,
            call_to_action: true,
            narration: None,
            music: None,
            cue_gain: 0.8,
            font_dirs: Vec::new(),
        }
    }
}

impl PostConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), String> {
        parse_transition(&self.transition).map_err(|e| format!("post.transition: {e}"))?;
        if !self.cue_gain.is_finite() || self.cue_gain < 0.0 {
            return Err("post.cue_gain must be finite and >= 0".to_string());
        }
        let style = &self.overlay_style;
        if !(style.font_size_frac > 0.0 && style.font_size_frac < 1.0) {
            return Err("post.overlay_style.font_size_frac must be in (0, 1)".to_string());
        }
        if !(0.0..0.5).contains(&style.margin_frac) {
            return Err("post.overlay_style.margin_frac must be in [0, 0.5)".to_string());
        }
        for (label, source) in [("narration", &self.narration), ("music", &self.music)] {
            if let Some(s) = source
                && (!s.gain.is_finite() || s.gain < 0.0)
            {
                return Err(format!("post.{label}.gain must be finite and >= 0"));
            }
        }
        Ok(())
    }
}

/// A caption rasterized for every frame size in its scene range.
#[derive(Clone, Debug)]
struct OverlayLayer {
    anchor: SceneRange,
    frames: Range<u64>,
    rasters: Vec<Arc<FrameRGBA>>,
}

impl OverlayLayer {
    fn raster_for(&self, width: u32, height: u32) -> Option<&FrameRGBA> {
        self.rasters
            .iter()
            .map(Arc::as_ref)
            .find(|r| r.width == width && r.height == height)
    }
}

/// The assembled timeline plus transitions, caption layers and the audio mix.
///
/// Output frames are materialized on demand by [`CompositedTimeline::render_frame`].
#[derive(Clone, Debug)]
pub struct CompositedTimeline {
    timeline: AssembledTimeline,
    transitions: Vec<BoundaryTransition>,
    overlays: Vec<OverlayLayer>,
    audio: Option<MixedAudio>,
    issues: Vec<PostProcessError>,
}

impl CompositedTimeline {
    /// A timeline with no layers: frames render exactly as assembled.
    pub fn from_assembled(timeline: AssembledTimeline) -> Self {
        Self {
            timeline,
            transitions: Vec::new(),
            overlays: Vec::new(),
            audio: None,
            issues: Vec::new(),
        }
    }

    /// Underlying assembled timeline.
    pub fn timeline(&self) -> &AssembledTimeline {
        &self.timeline
    }

    /// Frame rate.
    pub fn fps(&self) -> Fps {
        self.timeline.fps
    }

    /// Total frame count.
    pub fn total_frames(&self) -> u64 {
        self.timeline.total_frames()
    }

    /// Total duration in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.timeline.total_duration_seconds
    }

    /// Audio mix, if any track was supplied.
    pub fn audio(&self) -> Option<&MixedAudio> {
        self.audio.as_ref()
    }

    /// Layers dropped or degraded while compositing.
    pub fn issues(&self) -> &[PostProcessError] {
        &self.issues
    }

    /// Anchors of the caption layers that made it onto the timeline.
    pub fn overlay_anchors(&self) -> Vec<SceneRange> {
        self.overlays.iter().map(|o| o.anchor).collect()
    }

    /// Number of scene boundaries with a blended transition.
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Materialize output frame `index`.
    pub fn render_frame(&self, index: u64) -> Result<FrameRGBA, PostProcessError> {
        let (pos, local) = self.timeline.locate(index).ok_or_else(|| {
            PostProcessError::Composite(format!(
                "frame {index} is outside the timeline ({} frames)",
                self.total_frames()
            ))
        })?;
        let clips = &self.timeline.clips;
        let base = &clips[pos].frames[local];

        let transition = self
            .transitions
            .iter()
            .find(|t| t.outgoing == pos && t.covers(index));
        let mut frame = match transition {
            Some(t) => {
                let incoming_local = (index - t.window_start) as usize;
                match clips
                    .get(pos + 1)
                    .and_then(|c| c.frames.get(incoming_local))
                {
                    Some(incoming) => blend_frames(base, incoming, &t.kind, t.progress(index))?,
                    None => FrameRGBA::clone(base),
                }
            }
            None => FrameRGBA::clone(base),
        };

        for layer in self.overlays.iter().filter(|l| l.frames.contains(&index)) {
            if let Some(raster) = layer.raster_for(frame.width, frame.height) {
                over_in_place(&mut frame.data, &raster.data, 1.0)?;
            }
        }
        Ok(frame)
    }
}

/// Applies captions, transitions and audio to an assembled timeline.
#[derive(Clone, Debug)]
pub struct PostProcessor {
    cfg: PostConfig,
    transition: TransitionKind,
    renderer: Arc<dyn OverlayRenderer>,
}

impl PostProcessor {
    /// Processor with `cfg`, drawing captions through `renderer`.
    pub fn new(cfg: PostConfig, renderer: Arc<dyn OverlayRenderer>) -> ReelResult<Self> {
        let transition = parse_transition(&cfg.transition)?;
        Ok(Self {
            cfg,
            transition,
            renderer,
        })
    }

    /// Settings in use.
    pub fn config(&self) -> &PostConfig {
        &self.cfg
    }

    /// Composite `overlays` and `audio_tracks` onto `timeline`.
    ///
    /// Never fails: a layer that cannot be rendered or placed is dropped and recorded in
    /// [`CompositedTimeline::issues`].
    #[tracing::instrument(skip_all, fields(overlays = overlays.len(), tracks = audio_tracks.len()))]
    pub fn apply(
        &self,
        timeline: AssembledTimeline,
        overlays: Vec<OverlaySpec>,
        audio_tracks: Vec<AudioTrack>,
    ) -> CompositedTimeline {
        let mut issues = Vec::new();

        let transitions = plan_transitions(
            &timeline,
            &self.transition,
            self.cfg.transition.duration_secs,
            &mut issues,
        );

        let mut layers = Vec::with_capacity(overlays.len());
        for spec in overlays {
            match self.render_layer(&timeline, &spec) {
                Ok(layer) => layers.push(layer),
                Err(e) => {
                    tracing::warn!(anchor = %spec.anchor, error = %e, "overlay dropped");
                    issues.push(e);
                }
            }
        }

        let audio = if audio_tracks.is_empty() {
            None
        } else {
            Some(mix_tracks(&timeline, &audio_tracks, &mut issues))
        };

        CompositedTimeline {
            timeline,
            transitions,
            overlays: layers,
            audio,
            issues,
        }
    }

    fn render_layer(
        &self,
        timeline: &AssembledTimeline,
        spec: &OverlaySpec,
    ) -> Result<OverlayLayer, PostProcessError> {
        let frames = timeline.frames_for_range(spec.anchor).ok_or_else(|| {
            PostProcessError::InvalidAnchor {
                layer: format!("overlay {:?}", spec.text),
                anchor: spec.anchor,
                scenes: timeline.scene_count(),
            }
        })?;

        let mut sizes: Vec<(u32, u32)> = Vec::new();
        for clip in &timeline.clips[spec.anchor.start..=spec.anchor.end] {
            if let Some(dims) = clip.dimensions()
                && !sizes.contains(&dims)
            {
                sizes.push(dims);
            }
        }

        let mut rasters = Vec::with_capacity(sizes.len());
        for (w, h) in sizes {
            let raster = self
                .renderer
                .render(spec, w, h)
                .and_then(|r| {
                    if r.width == w && r.height == h {
                        Ok(r)
                    } else {
                        Err(PostProcessError::Render(format!(
                            "renderer returned {}x{}, expected {w}x{h}",
                            r.width, r.height
                        )))
                    }
                })
                .map_err(|cause| PostProcessError::Overlay {
                    anchor: spec.anchor,
                    cause: Box::new(cause),
                })?;
            rasters.push(Arc::new(raster));
        }

        Ok(OverlayLayer {
            anchor: spec.anchor,
            frames,
            rasters,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/post/processor.rs"]
mod tests;
