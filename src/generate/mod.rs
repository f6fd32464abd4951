//! Scene generation behind a single-method model capability.
//!
//! [`VideoModel`] is the only contact point with whatever text-to-video service is deployed.
//! [`SceneGenerator`] wraps one with prompt checks, a per-call timeout and bounded retries.

pub(crate) mod cache;
pub(crate) mod generator;
pub(crate) mod http;
pub(crate) mod model;
pub(crate) mod stub;

pub use cache::ClipCache;
pub use generator::{
    GeneratedClip, GenerationCause, GenerationConfig, GenerationError, RawClip, RetryPolicy,
    SceneGenerator,
};
pub use http::HttpVideoModel;
pub use model::{GenerationRequest, ModelError, ModelOutput, StyleConfig, VideoModel};
pub use stub::StubVideoModel;
