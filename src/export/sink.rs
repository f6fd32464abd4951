use std::path::PathBuf;

use crate::export::error::ExportError;
use crate::foundation::core::{Fps, FrameRGBA};
use crate::foundation::math::mul_div255_u16;

/// Stream parameters handed to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate.
    pub fps: Fps,
    /// Colour premultiplied alpha is flattened onto.
    pub background: [u8; 3],
    /// Optional raw PCM to mux alongside the video.
    pub audio: Option<AudioInputConfig>,
}

/// Raw interleaved `f32le` PCM on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInputConfig {
    /// Path to the samples.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Consumer of exported frames.
///
/// `push_frame` is called with strictly increasing indices starting at 0.
pub trait FrameSink: Send {
    /// Called once before any frame.
    fn begin(&mut self, cfg: SinkConfig) -> Result<(), ExportError>;
    /// Accept frame `idx`.
    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> Result<(), ExportError>;
    /// Flush and close; returns the number of frames written.
    fn end(&mut self) -> Result<u64, ExportError>;
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<FrameRGBA>,
}

impl InMemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration received in `begin`.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Frames received, in order.
    pub fn frames(&self) -> &[FrameRGBA] {
        &self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> Result<(), ExportError> {
        self.cfg = Some(cfg);
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> Result<(), ExportError> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ExportError::encode("in-memory sink not started"))?;
        check_frame(cfg, idx, self.frames.len() as u64, frame)?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> Result<u64, ExportError> {
        Ok(self.frames.len() as u64)
    }
}

/// Shared ordering and size checks for sinks.
pub(crate) fn check_frame(
    cfg: &SinkConfig,
    idx: u64,
    expected_idx: u64,
    frame: &FrameRGBA,
) -> Result<(), ExportError> {
    if idx != expected_idx {
        return Err(ExportError::encode(format!(
            "frame {idx} pushed out of order (expected {expected_idx})"
        )));
    }
    if frame.width != cfg.width || frame.height != cfg.height {
        return Err(ExportError::encode(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, cfg.width, cfg.height
        )));
    }
    Ok(())
}

/// Composite premultiplied RGBA8 over an opaque background.
pub(crate) fn flatten_premul_over_bg(
    dst: &mut [u8],
    src_premul: &[u8],
    bg: [u8; 3],
) -> Result<(), ExportError> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ExportError::encode(
            "flatten expects equal-length rgba8 buffers",
        ));
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let v = u16::from(s[c]) + mul_div255_u16(u16::from(bg[c]), inv);
            d[c] = v.min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/export/sink.rs"]
mod tests;
