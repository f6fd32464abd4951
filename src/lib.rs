//! storyreel turns a short structured script into a finished vertical video.
//!
//! A run moves through fixed stages:
//!
//! - Validate the script ([`validate_script`])
//! - Generate one clip per scene through a [`VideoModel`], concurrently and with retries
//! - Assemble the clips on a constant-rate timeline in scene order
//! - Add captions, transitions and an audio mix
//! - Export to the delivery format through a temporary file
//!
//! [`Orchestrator`] runs all of it and always returns one [`PipelineResult`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod assemble;
pub mod assets;
pub mod export;
pub mod generate;
pub mod pipeline;
pub mod post;
pub mod script;

pub use crate::foundation::core::{Fps, FrameRGBA};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::assemble::{AssembledTimeline, ClipAssembler};
pub use crate::export::{ExportError, Exporter, TargetSpec};
pub use crate::generate::{SceneGenerator, StubVideoModel, VideoModel};
pub use crate::pipeline::{
    CancelReason, CancelToken, Orchestrator, PipelineConfig, PipelineResult, RunStatus,
};
pub use crate::post::{CompositedTimeline, PostProcessor};
pub use crate::script::{Scene, Script, validate_script};
