use crate::foundation::core::FrameRGBA;
use crate::script::Scene;

/// Visual style parameters shared by every scene of a run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Style keyword appended to each prompt (e.g. "cinematic").
    pub style: String,
    /// What the model should avoid.
    pub negative_prompt: Option<String>,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Requested number of frames per scene clip.
    pub num_frames: u32,
    /// Denoising steps for diffusion backends.
    pub num_inference_steps: u32,
    /// Requested native frame rate.
    pub fps: u32,
    /// Base seed; scene `i` uses `seed + i`.
    pub seed: Option<u64>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            style: "cinematic".to_string(),
            negative_prompt: Some(
                "worst quality, inconsistent motion, blurry, jittery, distorted".to_string(),
            ),
            width: 576,
            height: 1024,
            num_frames: 24,
            num_inference_steps: 50,
            fps: 24,
            seed: None,
        }
    }
}

impl StyleConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("style.width and style.height must be non-zero".to_string());
        }
        if self.num_frames == 0 {
            return Err("style.num_frames must be >= 1".to_string());
        }
        if self.fps == 0 {
            return Err("style.fps must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Everything a model needs to synthesize one scene.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct GenerationRequest {
    /// Scene this request belongs to.
    pub scene_index: usize,
    /// Full text prompt.
    pub prompt: String,
    /// Negative prompt, if any.
    pub negative_prompt: Option<String>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Number of frames requested.
    pub num_frames: u32,
    /// Denoising steps.
    pub num_inference_steps: u32,
    /// Requested frame rate.
    pub fps: u32,
    /// Per-scene seed.
    pub seed: Option<u64>,
}

impl GenerationRequest {
    /// Build the request for `scene` under `style`.
    pub fn for_scene(scene: &Scene, style: &StyleConfig) -> Self {
        Self {
            scene_index: scene.index,
            prompt: scene.prompt(style),
            negative_prompt: style.negative_prompt.clone(),
            width: style.width,
            height: style.height,
            num_frames: style.num_frames,
            num_inference_steps: style.num_inference_steps,
            fps: style.fps,
            seed: style.seed.map(|s| s.wrapping_add(scene.index as u64)),
        }
    }

    /// Upper bound of the decoded output size in bytes.
    pub fn estimated_output_bytes(&self) -> u64 {
        u64::from(self.num_frames) * u64::from(self.width) * u64::from(self.height) * 4
    }
}

/// Raw model output: frames plus the rate they were meant to play at.
#[derive(Clone, Debug)]
pub struct ModelOutput {
    /// Frames in playback order.
    pub frames: Vec<FrameRGBA>,
    /// Native frame rate.
    pub frame_rate: f64,
}

/// Failure reported by a model backend.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Worth retrying: overload, network, 5xx.
    #[error("transient model failure: {0}")]
    Transient(String),
    /// The backend refused the request; retrying the same request will not help.
    #[error("model rejected request: {0}")]
    Rejected(String),
}

/// The generative capability: one prompt in, one frame sequence out.
///
/// Implementations must be independent per call: the orchestrator runs several calls
/// concurrently against the same instance.
#[async_trait::async_trait]
pub trait VideoModel: Send + Sync + std::fmt::Debug {
    /// Synthesize a clip for `request`.
    async fn synthesize(&self, request: &GenerationRequest) -> Result<ModelOutput, ModelError>;
}
