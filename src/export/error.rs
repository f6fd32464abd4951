use crate::pipeline::CancelReason;
use crate::post::PostProcessError;

/// Why an export did not produce a file. The destination is untouched in every case.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The requested aspect ratio is not one the exporter can deliver.
    #[error("unsupported aspect ratio '{aspect}' (supported: {supported})")]
    UnsupportedAspect {
        /// Requested ratio as written.
        aspect: String,
        /// Supported ratios, comma separated.
        supported: String,
    },
    /// Width, height or another target setting is unusable.
    #[error("invalid export target: {0}")]
    InvalidTarget(String),
    /// The timeline has no frames.
    #[error("nothing to export: the timeline has no frames")]
    EmptyTimeline,
    /// The run was cancelled while encoding.
    #[error("export cancelled: {0}")]
    Cancelled(CancelReason),
    /// Encoded length disagrees with the timeline.
    #[error(
        "encoded duration {encoded_secs:.3}s deviates from timeline duration {expected_secs:.3}s by more than {tolerance_secs:.4}s"
    )]
    DurationMismatch {
        /// Frames written divided by the frame rate.
        encoded_secs: f64,
        /// Composited timeline duration.
        expected_secs: f64,
        /// One frame interval.
        tolerance_secs: f64,
    },
    /// The output would exceed the target's maximum duration.
    #[error("duration {duration_secs:.3}s exceeds the target maximum of {max_secs:.3}s")]
    TooLong {
        /// Timeline duration.
        duration_secs: f64,
        /// Configured maximum.
        max_secs: f64,
    },
    /// A frame could not be composited.
    #[error("frame {frame} could not be rendered: {source}")]
    Render {
        /// Global frame index.
        frame: u64,
        /// Underlying failure.
        source: PostProcessError,
    },
    /// The sink rejected a frame or the encoder failed.
    #[error("encode failed: {0}")]
    Encode(String),
    /// Filesystem failure around the output file.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// Underlying failure.
        source: std::io::Error,
    },
}

impl ExportError {
    /// Build an [`ExportError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
