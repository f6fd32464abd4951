use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelOutput, ModelError>>>,
    calls: AtomicU32,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<ModelOutput, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait::async_trait]
impl VideoModel for ScriptedModel {
    async fn synthesize(&self, _request: &GenerationRequest) -> Result<ModelOutput, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Rejected("no more replies".to_string())))
    }
}

#[derive(Debug)]
struct SlowModel;

#[async_trait::async_trait]
impl VideoModel for SlowModel {
    async fn synthesize(&self, _request: &GenerationRequest) -> Result<ModelOutput, ModelError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ModelError::Transient("unreachable".to_string()))
    }
}

fn scene(index: usize, description: &str) -> Scene {
    Scene {
        index,
        description: description.to_string(),
        duration_seconds: 5.0,
        overlay_text: None,
        audio_cue: None,
    }
}

fn small_style() -> StyleConfig {
    StyleConfig {
        width: 4,
        height: 8,
        num_frames: 3,
        ..StyleConfig::default()
    }
}

fn output(frames: usize) -> ModelOutput {
    ModelOutput {
        frames: (0..frames).map(|_| FrameRGBA::solid(4, 8, [10, 20, 30])).collect(),
        frame_rate: 8.0,
    }
}

fn fast_cfg() -> GenerationConfig {
    GenerationConfig {
        initial_backoff_ms: 10,
        max_backoff_ms: 40,
        ..GenerationConfig::default()
    }
}

#[test]
fn default_config_matches_documented_values() {
    let cfg = GenerationConfig::default();
    assert_eq!(cfg.max_attempts, 3);
    assert_eq!(cfg.max_concurrency, 2);
    assert_eq!(cfg.call_timeout(), Duration::from_secs(300));
    assert!(cfg.validate().is_ok());
}

#[test]
fn config_rejects_zero_attempts_and_concurrency() {
    let mut cfg = GenerationConfig {
        max_attempts: 0,
        ..GenerationConfig::default()
    };
    assert!(cfg.validate().unwrap_err().contains("max_attempts"));
    cfg.max_attempts = 1;
    cfg.max_concurrency = 0;
    assert!(cfg.validate().unwrap_err().contains("max_concurrency"));
}

#[test]
fn backoff_doubles_and_is_capped() {
    let policy = RetryPolicy {
        max_attempts: 10,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_millis(350),
        multiplier: 2.0,
    };
    assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    assert_eq!(policy.delay_for(3), Duration::from_millis(350));
    assert_eq!(policy.delay_for(40), Duration::from_millis(350));
}

#[test]
fn retryable_causes() {
    assert!(GenerationCause::Timeout(Duration::from_secs(1)).is_retryable());
    assert!(GenerationCause::EmptyOutput.is_retryable());
    assert!(GenerationCause::Backend("503".into()).is_retryable());
    assert!(!GenerationCause::Rejected("400".into()).is_retryable());
    assert!(!GenerationCause::InvalidPrompt("x".into()).is_retryable());
    assert!(!GenerationCause::ResourceLimit("x".into()).is_retryable());
}

#[test]
fn request_seed_is_offset_by_scene_index() {
    let style = StyleConfig {
        seed: Some(100),
        ..small_style()
    };
    let req = GenerationRequest::for_scene(&scene(3, "A harbour at dawn"), &style);
    assert_eq!(req.seed, Some(103));
    assert_eq!(req.scene_index, 3);
    assert!(req.prompt.starts_with("A harbour at dawn"));
}

#[tokio::test(start_paused = true)]
async fn transient_failure_then_success_reports_attempts() {
    let model = ScriptedModel::new(vec![
        Err(ModelError::Transient("overloaded".into())),
        Ok(output(3)),
    ]);
    let generator = SceneGenerator::new(model.clone(), &fast_cfg());

    let got = generator
        .generate_traced(&scene(1, "A quiet street"), &small_style())
        .await
        .unwrap();
    assert_eq!(got.attempts, 2);
    assert!(!got.cached);
    assert_eq!(got.clip.scene_index, 1);
    assert_eq!(got.clip.frames.len(), 3);
    assert_eq!(got.clip.native_frame_rate, 8.0);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn rejection_is_not_retried() {
    let model = ScriptedModel::new(vec![Err(ModelError::Rejected("content policy".into()))]);
    let generator = SceneGenerator::new(model.clone(), &fast_cfg());

    let err = generator
        .generate(&scene(0, "A quiet street"), &small_style())
        .await
        .unwrap_err();
    assert_eq!(err.attempts, 1);
    assert!(matches!(err.cause, GenerationCause::Rejected(_)));
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_output_exhausts_retries() {
    let model = ScriptedModel::new(vec![Ok(output(0)), Ok(output(0)), Ok(output(0))]);
    let generator = SceneGenerator::new(model.clone(), &fast_cfg());

    let err = generator
        .generate(&scene(2, "A quiet street"), &small_style())
        .await
        .unwrap_err();
    assert_eq!(err.scene_index, 2);
    assert_eq!(err.attempts, 3);
    assert_eq!(err.cause, GenerationCause::EmptyOutput);
    assert!(err.to_string().contains("scene 2"));
}

#[tokio::test(start_paused = true)]
async fn slow_model_times_out_on_every_attempt() {
    let cfg = GenerationConfig {
        max_attempts: 2,
        call_timeout_secs: 1.0,
        ..fast_cfg()
    };
    let generator = SceneGenerator::new(Arc::new(SlowModel), &cfg);

    let err = generator
        .generate(&scene(0, "A quiet street"), &small_style())
        .await
        .unwrap_err();
    assert_eq!(err.attempts, 2);
    assert_eq!(err.cause, GenerationCause::Timeout(Duration::from_secs(1)));
}

#[tokio::test]
async fn overlong_prompt_is_refused_without_calling_the_model() {
    let model = ScriptedModel::new(vec![Ok(output(3))]);
    let generator = SceneGenerator::new(model.clone(), &fast_cfg());

    let long = "a".repeat(MAX_PROMPT_CHARS + 1);
    let err = generator
        .generate(&scene(0, &long), &small_style())
        .await
        .unwrap_err();
    assert_eq!(err.attempts, 0);
    assert!(matches!(err.cause, GenerationCause::InvalidPrompt(_)));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn request_over_memory_ceiling_is_refused() {
    let cfg = GenerationConfig {
        memory_ceiling_bytes: Some(64),
        ..fast_cfg()
    };
    let model = ScriptedModel::new(vec![Ok(output(3))]);
    let generator = SceneGenerator::new(model.clone(), &cfg);

    let err = generator
        .generate(&scene(0, "A quiet street"), &small_style())
        .await
        .unwrap_err();
    assert!(matches!(err.cause, GenerationCause::ResourceLimit(_)));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn mixed_frame_sizes_are_treated_as_backend_failure() {
    let mut bad = output(2);
    bad.frames.push(FrameRGBA::solid(2, 2, [0, 0, 0]));
    let model = ScriptedModel::new(vec![Ok(bad), Ok(output(2))]);
    let generator = SceneGenerator::new(model, &fast_cfg());

    let got = generator
        .generate_traced(&scene(0, "A quiet street"), &small_style())
        .await
        .unwrap();
    assert_eq!(got.attempts, 2);
    assert_eq!(got.clip.frames.len(), 2);
}

#[tokio::test]
async fn cache_hit_skips_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ClipCache::new(dir.path().join("clips"));
    let model = ScriptedModel::new(vec![Ok(output(3))]);
    let generator = SceneGenerator::new(model.clone(), &fast_cfg()).with_cache(cache);
    let style = small_style();
    let s = scene(0, "A quiet street");

    let first = generator.generate_traced(&s, &style).await.unwrap();
    assert!(!first.cached);
    let second = generator.generate_traced(&s, &style).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.attempts, 0);
    assert_eq!(second.clip, first.clip);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cached_clip_over_memory_ceiling_is_regenerated() {
    let dir = tempfile::tempdir().unwrap();
    let style = small_style();
    let s = scene(0, "A quiet street");

    // A model that ignores num_frames fills the cache with a six frame clip.
    let lavish = ScriptedModel::new(vec![Ok(output(6))]);
    SceneGenerator::new(lavish, &fast_cfg())
        .with_cache(ClipCache::new(dir.path().join("clips")))
        .generate(&s, &style)
        .await
        .unwrap();

    let cfg = GenerationConfig {
        memory_ceiling_bytes: Some(3 * 4 * 8 * 4),
        ..fast_cfg()
    };
    let model = ScriptedModel::new(vec![Ok(output(3))]);
    let generator =
        SceneGenerator::new(model.clone(), &cfg).with_cache(ClipCache::new(dir.path().join("clips")));

    let got = generator.generate_traced(&s, &style).await.unwrap();
    assert!(!got.cached);
    assert_eq!(got.attempts, 1);
    assert_eq!(got.clip.frames.len(), 3);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}
