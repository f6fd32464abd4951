//! Delivery encoding: fit frames to the target shape, stream them to a sink, land the file
//! atomically.

pub(crate) mod error;
pub(crate) mod exporter;
pub(crate) mod ffmpeg;
pub(crate) mod fit;
pub(crate) mod measure;
pub(crate) mod sink;
pub(crate) mod target;
pub(crate) mod y4m;

pub use error::ExportError;
pub use exporter::{ExportReport, Exporter};
pub use ffmpeg::FfmpegSink;
pub use sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use target::{Aspect, FitPolicy, OutputFormat, SUPPORTED_ASPECTS, TargetSpec};
pub use y4m::Y4mSink;
