//! Run orchestration: stage state machine, cancellation, configuration and the run report.
//!
//! [`Orchestrator`] owns one instance of every stage. Scene generation runs concurrently on the
//! async runtime; assembly, post-processing and export run strictly afterwards, the CPU-bound
//! ones on blocking threads.

pub(crate) mod cancel;
pub(crate) mod config;
pub(crate) mod orchestrator;
pub(crate) mod result;
pub(crate) mod state;

pub use cancel::{CancelReason, CancelToken};
pub use config::PipelineConfig;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use result::{PipelineResult, RunStatus, SceneReport, SceneStatus};
pub use state::{IllegalTransition, PipelineStage, StageRecord, StageTracker};
