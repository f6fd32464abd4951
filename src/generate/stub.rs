use std::sync::atomic::{AtomicUsize, Ordering};

use crate::foundation::core::FrameRGBA;
use crate::generate::model::{GenerationRequest, ModelError, ModelOutput, VideoModel};

/// Offline model producing deterministic solid-colour clips.
///
/// The colour is derived from the prompt, and the blue channel steps with the frame number, so
/// distinct scenes and distinct frames are distinguishable after resampling.
#[derive(Debug)]
pub struct StubVideoModel {
    frames: usize,
    frame_rate: f64,
    size: Option<(u32, u32)>,
    calls: AtomicUsize,
}

impl StubVideoModel {
    /// `frames` frames per clip at `frame_rate`, sized as requested.
    pub fn new(frames: usize, frame_rate: f64) -> Self {
        Self {
            frames,
            frame_rate,
            size: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Ignore the requested size and always emit `width x height` frames.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    /// Number of `synthesize` calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Colour of frame `frame` for `prompt`.
    pub fn frame_colour(prompt: &str, frame: usize) -> [u8; 3] {
        let h = xxhash_rust::xxh3::xxh3_64(prompt.as_bytes());
        [(h & 0xff) as u8, ((h >> 8) & 0xff) as u8, (frame % 256) as u8]
    }
}

impl Default for StubVideoModel {
    fn default() -> Self {
        Self::new(24, 8.0)
    }
}

#[async_trait::async_trait]
impl VideoModel for StubVideoModel {
    async fn synthesize(&self, request: &GenerationRequest) -> Result<ModelOutput, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (w, h) = self.size.unwrap_or((request.width, request.height));
        if w == 0 || h == 0 {
            return Err(ModelError::Rejected("zero-sized frames requested".to_string()));
        }
        let frames = (0..self.frames)
            .map(|i| FrameRGBA::solid(w, h, Self::frame_colour(&request.prompt, i)))
            .collect();
        Ok(ModelOutput {
            frames,
            frame_rate: self.frame_rate,
        })
    }
}
