//! Time-accurate assembly of raw clips into one contiguous timeline.

pub(crate) mod assembler;
pub(crate) mod timeline;

pub use assembler::{AssemblyConfig, AssemblyError, ClipAssembler, ExtendPolicy, placeholder_clip};
pub use timeline::{AssembledTimeline, SceneRange, TimelineClip};
