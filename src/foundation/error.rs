use crate::assemble::AssemblyError;
use crate::export::ExportError;
use crate::generate::GenerationError;
use crate::post::PostProcessError;
use crate::script::ScriptError;

/// Convenience result type used across storyreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by library APIs.
///
/// Stage-specific errors convert into this type with `?`; callers that need to branch on a
/// stage keep the stage error instead.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user-provided data or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Script parsing or validation failure.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Scene generation failure after retries.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Clip assembly invariant violation.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// Overlay or audio layer failure.
    #[error(transparent)]
    PostProcess(#[from] PostProcessError),

    /// Encoding or output failure.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for ReelError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
