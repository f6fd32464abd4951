use std::sync::Arc;
use std::time::Duration;

use crate::foundation::core::FrameRGBA;
use crate::generate::cache::ClipCache;
use crate::generate::model::{GenerationRequest, ModelError, ModelOutput, StyleConfig, VideoModel};
use crate::script::Scene;

/// Prompts longer than this are refused before any model call.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// Retry, timeout and resource settings for scene generation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Total attempts per scene, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay.
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
    /// Per-call timeout in seconds.
    pub call_timeout_secs: f64,
    /// Refuse requests or outputs whose decoded size exceeds this many bytes.
    pub memory_ceiling_bytes: Option<u64>,
    /// Scenes generated concurrently.
    pub max_concurrency: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            call_timeout_secs: 300.0,
            memory_ceiling_bytes: Some(6 * 1024 * 1024 * 1024),
            max_concurrency: 2,
        }
    }
}

impl GenerationConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("generation.max_attempts must be >= 1".to_string());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err("generation.backoff_multiplier must be finite and >= 1".to_string());
        }
        if !self.call_timeout_secs.is_finite() || self.call_timeout_secs <= 0.0 {
            return Err("generation.call_timeout_secs must be finite and > 0".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("generation.max_concurrency must be >= 1".to_string());
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err("generation.max_backoff_ms must be >= initial_backoff_ms".to_string());
        }
        Ok(())
    }

    /// Retry schedule described by this config.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.backoff_multiplier.max(1.0),
        }
    }

    /// Per-call timeout as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.call_timeout_secs.max(0.001))
    }
}

/// Exponential backoff schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Cap on any delay.
    pub max_backoff: Duration,
    /// Growth factor.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exp);
        let capped = secs.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

/// Why a scene could not be generated.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GenerationCause {
    /// A model call exceeded the per-call timeout.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    /// The model returned zero frames.
    #[error("model returned no frames")]
    EmptyOutput,
    /// The prompt or request parameters are unusable.
    #[error("invalid prompt: {0}")]
    InvalidPrompt(String),
    /// The request or its output would exceed the memory ceiling.
    #[error("resource limit: {0}")]
    ResourceLimit(String),
    /// The backend refused the request.
    #[error("rejected by model: {0}")]
    Rejected(String),
    /// Transient backend failure or malformed output.
    #[error("backend failure: {0}")]
    Backend(String),
    /// The run was cancelled before this scene finished.
    #[error("cancelled")]
    Cancelled,
}

impl GenerationCause {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::EmptyOutput | Self::Backend(_))
    }
}

impl From<ModelError> for GenerationCause {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Transient(msg) => Self::Backend(msg),
            ModelError::Rejected(msg) => Self::Rejected(msg),
        }
    }
}

/// A scene that could not be generated, after all permitted attempts.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("scene {scene_index} failed after {attempts} attempt(s): {cause}")]
pub struct GenerationError {
    /// Scene that failed.
    pub scene_index: usize,
    /// Model calls made; `0` when the request was refused up front.
    pub attempts: u32,
    /// Last failure observed.
    pub cause: GenerationCause,
}

/// Frames produced for one scene, at the model's native frame rate.
#[derive(Clone, Debug, PartialEq)]
pub struct RawClip {
    /// Scene this clip belongs to.
    pub scene_index: usize,
    /// Non-empty, uniformly sized frames.
    pub frames: Vec<Arc<FrameRGBA>>,
    /// Native frame rate, always finite and `> 0`.
    pub native_frame_rate: f64,
}

impl RawClip {
    /// Natural length of the clip in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.native_frame_rate
    }

    /// Frame dimensions.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| (f.width, f.height))
    }
}

/// A successful generation together with how it was obtained.
#[derive(Clone, Debug)]
pub struct GeneratedClip {
    /// The clip.
    pub clip: RawClip,
    /// Model calls made (`0` for a cache hit).
    pub attempts: u32,
    /// Whether the clip came from the on-disk cache.
    pub cached: bool,
}

/// Turns scenes into raw clips through a [`VideoModel`].
#[derive(Clone, Debug)]
pub struct SceneGenerator {
    model: Arc<dyn VideoModel>,
    policy: RetryPolicy,
    call_timeout: Duration,
    memory_ceiling: Option<u64>,
    cache: Option<ClipCache>,
}

impl SceneGenerator {
    /// Wrap `model` with the retry and timeout settings from `cfg`.
    pub fn new(model: Arc<dyn VideoModel>, cfg: &GenerationConfig) -> Self {
        Self {
            model,
            policy: cfg.retry_policy(),
            call_timeout: cfg.call_timeout(),
            memory_ceiling: cfg.memory_ceiling_bytes,
            cache: None,
        }
    }

    /// Reuse clips from `cache` and store new ones there.
    pub fn with_cache(mut self, cache: ClipCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The retry schedule in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Generate the clip for one scene.
    pub async fn generate(
        &self,
        scene: &Scene,
        style: &StyleConfig,
    ) -> Result<RawClip, GenerationError> {
        self.generate_traced(scene, style).await.map(|g| g.clip)
    }

    /// Like [`SceneGenerator::generate`], also reporting attempts and cache use.
    #[tracing::instrument(skip_all, fields(scene = scene.index))]
    pub async fn generate_traced(
        &self,
        scene: &Scene,
        style: &StyleConfig,
    ) -> Result<GeneratedClip, GenerationError> {
        let request = GenerationRequest::for_scene(scene, style);
        let fail = |attempts: u32, cause: GenerationCause| GenerationError {
            scene_index: scene.index,
            attempts,
            cause,
        };

        self.check_request(&request).map_err(|cause| fail(0, cause))?;

        if let Some(cache) = &self.cache {
            let cache = cache.clone();
            let req = request.clone();
            let hit = match tokio::task::spawn_blocking(move || cache.load(&req)).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(error = %e, "clip cache lookup task failed");
                    None
                }
            };
            if let Some(clip) = hit {
                let checked =
                    self.check_frames(clip.frames.iter().map(Arc::as_ref), clip.native_frame_rate);
                match checked {
                    Ok(()) => {
                        tracing::debug!("clip cache hit");
                        return Ok(GeneratedClip {
                            clip,
                            attempts: 0,
                            cached: true,
                        });
                    }
                    Err(cause) => {
                        tracing::warn!(error = %cause, "cached clip rejected, regenerating");
                    }
                }
            }
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome =
                match tokio::time::timeout(self.call_timeout, self.model.synthesize(&request)).await
                {
                    Err(_) => Err(GenerationCause::Timeout(self.call_timeout)),
                    Ok(Err(e)) => Err(GenerationCause::from(e)),
                    Ok(Ok(output)) => self.accept_output(scene.index, output),
                };

            match outcome {
                Ok(clip) => {
                    if let Some(cache) = &self.cache {
                        let cache = cache.clone();
                        let req = request.clone();
                        let stored = clip.clone();
                        if let Err(e) =
                            tokio::task::spawn_blocking(move || cache.store(&req, &stored)).await
                        {
                            tracing::warn!(error = %e, "clip cache store task failed");
                        }
                    }
                    return Ok(GeneratedClip {
                        clip,
                        attempts: attempt,
                        cached: false,
                    });
                }
                Err(cause) if cause.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(attempt, ?delay, error = %cause, "scene generation failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(cause) => return Err(fail(attempt, cause)),
            }
        }
    }

    fn check_request(&self, request: &GenerationRequest) -> Result<(), GenerationCause> {
        let chars = request.prompt.chars().count();
        if request.prompt.trim().is_empty() {
            return Err(GenerationCause::InvalidPrompt("prompt is empty".to_string()));
        }
        if chars > MAX_PROMPT_CHARS {
            return Err(GenerationCause::InvalidPrompt(format!(
                "prompt has {chars} characters, limit is {MAX_PROMPT_CHARS}"
            )));
        }
        if request.width == 0 || request.height == 0 || request.num_frames == 0 {
            return Err(GenerationCause::InvalidPrompt(
                "width, height and num_frames must be non-zero".to_string(),
            ));
        }
        if let Some(ceiling) = self.memory_ceiling {
            let estimate = request.estimated_output_bytes();
            if estimate > ceiling {
                return Err(GenerationCause::ResourceLimit(format!(
                    "request needs about {estimate} bytes, ceiling is {ceiling}"
                )));
            }
        }
        Ok(())
    }

    fn accept_output(
        &self,
        scene_index: usize,
        output: ModelOutput,
    ) -> Result<RawClip, GenerationCause> {
        self.check_frames(output.frames.iter(), output.frame_rate)?;
        Ok(RawClip {
            scene_index,
            frames: output.frames.into_iter().map(Arc::new).collect(),
            native_frame_rate: output.frame_rate,
        })
    }

    /// Checks shared by fresh model output and cached clips.
    fn check_frames<'a>(
        &self,
        mut frames: impl Iterator<Item = &'a FrameRGBA>,
        frame_rate: f64,
    ) -> Result<(), GenerationCause> {
        let Some(first) = frames.next() else {
            return Err(GenerationCause::EmptyOutput);
        };
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(GenerationCause::Backend(format!(
                "invalid frame rate {frame_rate}"
            )));
        }
        let (w, h) = (first.width, first.height);
        let mut total: u64 = 0;
        for (i, frame) in std::iter::once(first).chain(frames).enumerate() {
            frame
                .validate()
                .map_err(|e| GenerationCause::Backend(format!("frame {i}: {e}")))?;
            if frame.width != w || frame.height != h {
                return Err(GenerationCause::Backend(format!(
                    "frame {i} is {}x{}, expected {w}x{h}",
                    frame.width, frame.height
                )));
            }
            total += frame.data.len() as u64;
        }
        if let Some(ceiling) = self.memory_ceiling
            && total > ceiling
        {
            return Err(GenerationCause::ResourceLimit(format!(
                "output holds {total} bytes, ceiling is {ceiling}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/generator.rs"]
mod tests;
