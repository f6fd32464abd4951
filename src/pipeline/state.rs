use std::time::Instant;

/// Where a run is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Checking the script.
    Validating,
    /// Calling the model for every scene.
    Generating,
    /// Building the timeline.
    Assembling,
    /// Captions, transitions, audio.
    PostProcessing,
    /// Writing the output file.
    Exporting,
    /// Finished with an output file.
    Done,
    /// Finished without one.
    Failed,
}

impl PipelineStage {
    /// `Done` and `Failed` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The stage that normally follows this one.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Validating => Some(Self::Generating),
            Self::Generating => Some(Self::Assembling),
            Self::Assembling => Some(Self::PostProcessing),
            Self::PostProcessing => Some(Self::Exporting),
            Self::Exporting => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_advance_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validating => "validating",
            Self::Generating => "generating",
            Self::Assembling => "assembling",
            Self::PostProcessing => "post_processing",
            Self::Exporting => "exporting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A transition the state machine does not allow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("illegal pipeline transition {from} -> {to}")]
pub struct IllegalTransition {
    /// Current stage.
    pub from: PipelineStage,
    /// Requested stage.
    pub to: PipelineStage,
}

/// Time spent in one stage.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StageRecord {
    /// Stage.
    pub stage: PipelineStage,
    /// Seconds spent before the next transition.
    pub elapsed_secs: f64,
}

/// Enforces the stage order and records how long each stage took.
#[derive(Debug)]
pub struct StageTracker {
    current: PipelineStage,
    entered: Instant,
    history: Vec<StageRecord>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    /// Tracker in `Validating`.
    pub fn new() -> Self {
        Self::starting_at(PipelineStage::Validating)
    }

    /// Tracker in an arbitrary starting stage.
    pub fn starting_at(stage: PipelineStage) -> Self {
        tracing::info!(stage = %stage, "pipeline stage entered");
        Self {
            current: stage,
            entered: Instant::now(),
            history: Vec::new(),
        }
    }

    /// Current stage.
    pub fn current(&self) -> PipelineStage {
        self.current
    }

    /// Completed stages in order.
    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    /// Move to `to`, closing the timing record of the current stage.
    pub fn advance(&mut self, to: PipelineStage) -> Result<(), IllegalTransition> {
        if !self.current.can_advance_to(to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }
        self.history.push(StageRecord {
            stage: self.current,
            elapsed_secs: self.entered.elapsed().as_secs_f64(),
        });
        tracing::info!(from = %self.current, stage = %to, "pipeline stage entered");
        self.current = to;
        self.entered = Instant::now();
        Ok(())
    }

    /// Move to `Failed` and return the stage that failed. No-op once terminal.
    pub fn fail(&mut self) -> Option<PipelineStage> {
        let failed = self.current;
        self.advance(PipelineStage::Failed).ok().map(|_| failed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/state.rs"]
mod tests;
