//! Captions, scene transitions and the audio mix layered over an assembled timeline.
//!
//! Problems here degrade the output instead of failing it: a caption that cannot be drawn is
//! dropped, a boundary that cannot blend becomes a cut, a missing cue is silent. Each is
//! recorded on [`CompositedTimeline::issues`].

pub(crate) mod audio;
pub(crate) mod composite;
pub(crate) mod cues;
pub(crate) mod error;
pub(crate) mod overlay;
pub(crate) mod processor;
pub(crate) mod transitions;

pub use audio::{AudioAnchor, AudioTrack, MixedAudio};
pub use composite::WipeDir;
pub use cues::{AudioCueResolver, CUE_EXTENSIONS, DirCueResolver, TrackSource, plan_audio};
pub use error::PostProcessError;
pub use overlay::{
    OverlayPlacement, OverlayRenderer, OverlaySpec, OverlayStyle, SvgOverlayRenderer,
    plan_overlays,
};
pub use processor::{CompositedTimeline, PostConfig, PostProcessor};
pub use transitions::{TransitionKind, TransitionSpec, parse_transition};
