use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use futures::stream;

use crate::assemble::{ClipAssembler, placeholder_clip};
use crate::export::{ExportReport, Exporter};
use crate::foundation::error::ReelResult;
use crate::generate::{
    ClipCache, GeneratedClip, GenerationCause, GenerationError, RawClip, SceneGenerator,
    VideoModel,
};
use crate::pipeline::cancel::{CancelReason, CancelToken};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::result::{PipelineResult, RunStatus, SceneReport, SceneStatus};
use crate::pipeline::state::{PipelineStage, StageTracker};
use crate::post::{
    AudioCueResolver, DirCueResolver, OverlayRenderer, PostProcessor, SvgOverlayRenderer,
    plan_audio, plan_overlays,
};
use crate::script::{Script, ScriptError, validate_script};

/// Configures an [`Orchestrator`].
#[derive(Debug)]
pub struct OrchestratorBuilder {
    model: Arc<dyn VideoModel>,
    generator: Option<Arc<SceneGenerator>>,
    config: PipelineConfig,
    overlay_renderer: Option<Arc<dyn OverlayRenderer>>,
    cue_resolver: Option<Arc<dyn AudioCueResolver>>,
}

impl OrchestratorBuilder {
    /// Replace the default configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing generator instead of building one from the model and config.
    ///
    /// The generator's own retry, timeout and cache settings then apply.
    pub fn generator(mut self, generator: Arc<SceneGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Draw captions with `renderer` instead of the SVG renderer.
    pub fn overlay_renderer(mut self, renderer: Arc<dyn OverlayRenderer>) -> Self {
        self.overlay_renderer = Some(renderer);
        self
    }

    /// Resolve audio cues with `resolver` instead of looking in `audio_dir`.
    pub fn cue_resolver(mut self, resolver: Arc<dyn AudioCueResolver>) -> Self {
        self.cue_resolver = Some(resolver);
        self
    }

    /// Validate the configuration and wire the stages together.
    pub fn build(self) -> ReelResult<Orchestrator> {
        let cfg = self.config;
        cfg.validate()?;

        let generator = self.generator.unwrap_or_else(|| {
            let generator = SceneGenerator::new(self.model, &cfg.generation);
            Arc::new(match &cfg.cache_dir {
                Some(dir) => generator.with_cache(ClipCache::new(dir)),
                None => generator,
            })
        });
        let renderer = self
            .overlay_renderer
            .unwrap_or_else(|| Arc::new(SvgOverlayRenderer::new(&cfg.post.font_dirs)));
        let cue_resolver = self.cue_resolver.or_else(|| {
            cfg.audio_dir
                .as_ref()
                .map(|dir| Arc::new(DirCueResolver::new(dir)) as Arc<dyn AudioCueResolver>)
        });

        Ok(Orchestrator {
            generator,
            assembler: ClipAssembler::new(cfg.assembly.clone()),
            post: PostProcessor::new(cfg.post.clone(), renderer)?,
            cue_resolver,
            exporter: Exporter::new(),
            cfg,
        })
    }
}

/// Drives a script through every stage and reports the outcome as one [`PipelineResult`].
#[derive(Debug)]
pub struct Orchestrator {
    cfg: PipelineConfig,
    generator: Arc<SceneGenerator>,
    assembler: ClipAssembler,
    post: PostProcessor,
    cue_resolver: Option<Arc<dyn AudioCueResolver>>,
    exporter: Exporter,
}

/// Bookkeeping shared by every exit path of a run.
struct RunLog {
    started: Instant,
    tracker: StageTracker,
    scenes: Vec<SceneReport>,
    placeholders: Vec<usize>,
    warnings: Vec<String>,
}

impl RunLog {
    fn new(tracker: StageTracker) -> Self {
        Self {
            started: Instant::now(),
            tracker,
            scenes: Vec::new(),
            placeholders: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn enter(&mut self, stage: PipelineStage) -> Result<(), String> {
        self.tracker.advance(stage).map_err(|e| e.to_string())
    }

    fn warn(&mut self, msg: String) {
        tracing::warn!(warning = %msg, "run degraded");
        self.warnings.push(msg);
    }

    fn fail(mut self, error: String) -> PipelineResult {
        let failed_stage = self.tracker.fail();
        tracing::error!(stage = ?failed_stage, %error, "pipeline failed");
        PipelineResult {
            status: RunStatus::Failure,
            output_path: None,
            per_scene_status: self.scenes,
            placeholders: self.placeholders,
            warnings: self.warnings,
            stages: self.tracker.history().to_vec(),
            failed_stage,
            error: Some(error),
            duration_secs: self.started.elapsed().as_secs_f64(),
            export: None,
        }
    }

    fn finish(mut self, report: ExportReport) -> PipelineResult {
        if let Err(e) = self.tracker.advance(PipelineStage::Done) {
            return self.fail(e.to_string());
        }
        let status = if self.placeholders.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::PartialFailure
        };
        tracing::info!(?status, path = %report.path.display(), "pipeline finished");
        PipelineResult {
            status,
            output_path: Some(report.path.clone()),
            per_scene_status: self.scenes,
            placeholders: self.placeholders,
            warnings: self.warnings,
            stages: self.tracker.history().to_vec(),
            failed_stage: None,
            error: None,
            duration_secs: self.started.elapsed().as_secs_f64(),
            export: Some(report),
        }
    }
}

fn check_cancel(cancel: &CancelToken) -> Result<(), String> {
    match cancel.reason() {
        Some(reason) => Err(format!("run cancelled: {reason}")),
        None => Ok(()),
    }
}

impl Orchestrator {
    /// Start configuring an orchestrator around `model`.
    pub fn builder(model: Arc<dyn VideoModel>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            model,
            generator: None,
            config: PipelineConfig::default(),
            overlay_renderer: None,
            cue_resolver: None,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Validate `script` and render it to `dest`.
    pub async fn run(&self, script: &serde_json::Value, dest: impl AsRef<Path>) -> PipelineResult {
        self.run_with_cancel(script, dest, &CancelToken::new()).await
    }

    /// Like [`Orchestrator::run`], stopping early once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        script: &serde_json::Value,
        dest: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> PipelineResult {
        let mut log = RunLog::new(StageTracker::new());
        let script = match validate_script(script, &self.cfg.validation) {
            Ok(s) => s,
            Err(ScriptError::DurationMismatch(e)) if self.cfg.validation.allow_duration_mismatch => {
                log.warn(e.to_string());
                e.into_script()
            }
            Err(e) => return log.fail(e.to_string()),
        };
        self.drive(script, dest.as_ref(), cancel, log).await
    }

    /// Render an already validated script.
    pub async fn run_script(
        &self,
        script: Script,
        dest: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> PipelineResult {
        self.drive(script, dest.as_ref(), cancel, RunLog::new(StageTracker::new()))
            .await
    }

    #[tracing::instrument(skip_all, fields(title = script.title(), scenes = script.len()))]
    async fn drive(
        &self,
        script: Script,
        dest: &Path,
        cancel: &CancelToken,
        mut log: RunLog,
    ) -> PipelineResult {
        log.scenes = script
            .scenes()
            .iter()
            .map(|s| SceneReport {
                scene_index: s.index,
                status: SceneStatus::Pending,
            })
            .collect();

        let timer = self.cfg.run_timeout_secs.map(|secs| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs_f64(secs)).await;
                if token.cancel(CancelReason::TimedOut) {
                    tracing::warn!(timeout_secs = secs, "run timed out");
                }
            })
        });

        let outcome = self.stages(&script, dest, cancel, &mut log).await;
        if let Some(timer) = timer {
            timer.abort();
        }
        match outcome {
            Ok(report) => log.finish(report),
            Err(error) => log.fail(error),
        }
    }

    async fn stages(
        &self,
        script: &Script,
        dest: &Path,
        cancel: &CancelToken,
        log: &mut RunLog,
    ) -> Result<ExportReport, String> {
        log.enter(PipelineStage::Generating)?;
        let clips = self.generate_all(script, cancel, log).await?;
        check_cancel(cancel)?;

        log.enter(PipelineStage::Assembling)?;
        let timeline = self
            .assembler
            .assemble(script, &clips)
            .map_err(|e| e.to_string())?;
        drop(clips);
        check_cancel(cancel)?;

        log.enter(PipelineStage::PostProcessing)?;
        let post = self.post.clone();
        let resolver = self.cue_resolver.clone();
        let owned = script.clone();
        let (composited, issues) = tokio::task::spawn_blocking(move || {
            let overlays = plan_overlays(&owned, post.config());
            let (tracks, mut issues) =
                plan_audio(&owned, &timeline, post.config(), resolver.as_deref());
            let composited = post.apply(timeline, overlays, tracks);
            issues.extend(composited.issues().iter().cloned());
            (composited, issues)
        })
        .await
        .map_err(|e| format!("post-processing task failed: {e}"))?;
        for issue in issues {
            log.warn(issue.to_string());
        }
        check_cancel(cancel)?;

        log.enter(PipelineStage::Exporting)?;
        let exporter = self.exporter;
        let target = self.cfg.export.clone();
        let dest: PathBuf = dest.to_path_buf();
        let token = cancel.clone();
        tokio::task::spawn_blocking(move || exporter.export(&composited, &target, &dest, &token))
            .await
            .map_err(|e| format!("export task failed: {e}"))?
            .map_err(|e| e.to_string())
    }

    /// Generate every scene with bounded concurrency and return clips in scene order.
    ///
    /// Failed scenes are replaced by placeholders unless fail-fast is set.
    async fn generate_all(
        &self,
        script: &Script,
        cancel: &CancelToken,
        log: &mut RunLog,
    ) -> Result<Vec<RawClip>, String> {
        let generator = self.generator.as_ref();
        let style = &self.cfg.style;
        let concurrency = self.cfg.generation.max_concurrency.max(1);

        let mut results: Vec<Option<Result<GeneratedClip, GenerationError>>> =
            vec![None; script.len()];
        let mut aborted_by = None;
        {
            let mut pending = stream::iter(script.scenes())
                .map(move |scene| async move {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(GenerationError {
                            scene_index: scene.index,
                            attempts: 0,
                            cause: GenerationCause::Cancelled,
                        }),
                        r = generator.generate_traced(scene, style) => r,
                    };
                    (scene.index, outcome)
                })
                .buffer_unordered(concurrency);

            while let Some((index, outcome)) = pending.next().await {
                let failed = outcome.is_err();
                if let Err(e) = &outcome {
                    tracing::warn!(scene_index = index, error = %e, "scene generation failed");
                }
                results[index] = Some(outcome);
                if cancel.is_cancelled() {
                    break;
                }
                if failed && self.cfg.fail_fast {
                    aborted_by = Some(index);
                    break;
                }
            }
        }

        let mut first_error = None;
        for (slot, report) in results.iter().zip(log.scenes.iter_mut()) {
            report.status = match slot {
                Some(Ok(g)) => SceneStatus::succeeded(g.attempts, g.cached),
                Some(Err(e)) => {
                    if first_error.is_none() && e.cause != GenerationCause::Cancelled {
                        first_error = Some(e.to_string());
                    }
                    SceneStatus::Failed {
                        reason: e.cause.to_string(),
                        attempts: e.attempts,
                        placeholder: false,
                    }
                }
                None => SceneStatus::Failed {
                    reason: match aborted_by {
                        Some(i) => format!("aborted after scene {i} failed"),
                        None => "aborted".to_string(),
                    },
                    attempts: 0,
                    placeholder: false,
                },
            };
        }

        check_cancel(cancel)?;
        if self.cfg.fail_fast
            && let Some(error) = first_error
        {
            return Err(format!("fail-fast: {error}"));
        }
        if log.scenes.iter().all(|s| !s.status.is_generated()) {
            return Err(format!(
                "all {} scene(s) failed: {}",
                log.scenes.len(),
                failure_list(&log.scenes)
            ));
        }

        let mut clips = Vec::with_capacity(results.len());
        let mut substituted = Vec::new();
        for (slot, report) in results.into_iter().zip(log.scenes.iter_mut()) {
            match slot {
                Some(Ok(g)) => clips.push(g.clip),
                _ => {
                    let index = report.scene_index;
                    if let SceneStatus::Failed {
                        reason,
                        placeholder,
                        ..
                    } = &mut report.status
                    {
                        *placeholder = true;
                        substituted.push(format!(
                            "scene {index} replaced by a placeholder: {reason}"
                        ));
                    }
                    tracing::info!(scene_index = index, "placeholder substituted");
                    log.placeholders.push(index);
                    clips.push(placeholder_clip(
                        index,
                        style,
                        self.cfg.placeholder_colour,
                    ));
                }
            }
        }
        for msg in substituted {
            log.warn(msg);
        }
        Ok(clips)
    }
}

fn failure_list(scenes: &[SceneReport]) -> String {
    scenes
        .iter()
        .filter_map(|s| match &s.status {
            SceneStatus::Failed { reason, .. } => Some(format!("scene {}: {reason}", s.scene_index)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
