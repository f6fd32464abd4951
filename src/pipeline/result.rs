use std::fmt::Write as _;
use std::path::PathBuf;

use crate::export::ExportReport;
use crate::pipeline::state::{PipelineStage, StageRecord};

/// Overall outcome of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every scene generated and the file was written.
    Success,
    /// The file was written with placeholders for some scenes.
    PartialFailure,
    /// No file was written.
    Failure,
}

impl RunStatus {
    /// Process exit code for this outcome: 0, 2 or 1.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::PartialFailure => 2,
            Self::Failure => 1,
        }
    }
}

/// What happened to one scene.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SceneStatus {
    /// Not reached.
    Pending,
    /// Clip produced by the first model call or loaded from the cache.
    Ok {
        /// Whether the clip came from the cache.
        cached: bool,
    },
    /// Clip produced after one or more failed attempts.
    Retried {
        /// Model calls made, including the successful one.
        attempts: u32,
    },
    /// No clip was produced.
    Failed {
        /// Why.
        reason: String,
        /// Model calls made.
        attempts: u32,
        /// Whether a placeholder clip stands in for the scene in the output.
        placeholder: bool,
    },
}

impl SceneStatus {
    /// Status of a scene whose clip was obtained after `attempts` model calls.
    pub fn succeeded(attempts: u32, cached: bool) -> Self {
        if attempts > 1 {
            Self::Retried { attempts }
        } else {
            Self::Ok { cached }
        }
    }

    /// Whether the scene has a real clip.
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Ok { .. } | Self::Retried { .. })
    }
}

/// Status of one scene, by index.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneReport {
    /// Scene index.
    pub scene_index: usize,
    /// Outcome.
    #[serde(flatten)]
    pub status: SceneStatus,
}

/// The single result of a pipeline run.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PipelineResult {
    /// Overall outcome.
    pub status: RunStatus,
    /// Written file, unless the run failed.
    pub output_path: Option<PathBuf>,
    /// One entry per scene, in scene order.
    pub per_scene_status: Vec<SceneReport>,
    /// Scenes rendered as placeholders.
    pub placeholders: Vec<usize>,
    /// Degraded layers and accepted policy deviations.
    pub warnings: Vec<String>,
    /// Stages passed through, with timings.
    pub stages: Vec<StageRecord>,
    /// Stage that was active when the run failed.
    pub failed_stage: Option<PipelineStage>,
    /// Failure description.
    pub error: Option<String>,
    /// Wall time of the run.
    pub duration_secs: f64,
    /// Export details, when a file was written.
    pub export: Option<ExportReport>,
}

impl PipelineResult {
    /// Process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// Whether a file was produced.
    pub fn has_output(&self) -> bool {
        self.output_path.is_some()
    }

    /// Indices of scenes that failed, in order.
    pub fn failed_scenes(&self) -> Vec<usize> {
        self.per_scene_status
            .iter()
            .filter(|s| matches!(s.status, SceneStatus::Failed { .. }))
            .map(|s| s.scene_index)
            .collect()
    }

    /// Pretty JSON report.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let status = match self.status {
            RunStatus::Success => "success",
            RunStatus::PartialFailure => "partial failure",
            RunStatus::Failure => "failure",
        };
        let _ = writeln!(out, "status: {status} ({:.1}s)", self.duration_secs);
        if let Some(path) = &self.output_path {
            let _ = writeln!(out, "output: {}", path.display());
        }
        if let (Some(stage), Some(error)) = (self.failed_stage, &self.error) {
            let _ = writeln!(out, "failed while {stage}: {error}");
        }
        for scene in &self.per_scene_status {
            match &scene.status {
                SceneStatus::Pending => {
                    let _ = writeln!(out, "  scene {}: not reached", scene.scene_index);
                }
                SceneStatus::Ok { cached } => {
                    let how = if *cached { ", from cache" } else { "" };
                    let _ = writeln!(out, "  scene {}: ok{how}", scene.scene_index);
                }
                SceneStatus::Retried { attempts } => {
                    let _ = writeln!(
                        out,
                        "  scene {}: ok after {attempts} attempts",
                        scene.scene_index
                    );
                }
                SceneStatus::Failed {
                    reason,
                    placeholder,
                    ..
                } => {
                    let tail = if *placeholder { " [placeholder]" } else { "" };
                    let _ = writeln!(out, "  scene {}: FAILED {reason}{tail}", scene.scene_index);
                }
            }
        }
        for w in &self.warnings {
            let _ = writeln!(out, "warning: {w}");
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/result.rs"]
mod tests;
