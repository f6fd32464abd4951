use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate of the audio mix and of decoded sources.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Interleaved floating point audio.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Channel count (1 or 2 are mixed; extra channels are ignored).
    pub channels: u16,
    /// Interleaved samples in `[-1, 1]`.
    pub interleaved_f32: Arc<Vec<f32>>,
}

impl AudioPcm {
    /// Wrap interleaved samples.
    pub fn new(sample_rate: u32, channels: u16, interleaved_f32: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels,
            interleaved_f32: Arc::new(interleaved_f32),
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Whether there is anything to play.
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// Load an audio file: WAV is read directly, anything else goes through `ffmpeg`.
pub fn load_audio(path: &Path) -> ReelResult<AudioPcm> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if is_wav {
        read_wav(path)
    } else {
        decode_audio_f32_stereo(path, MIX_SAMPLE_RATE)
    }
}

/// Read a PCM WAV file (16/24/32-bit integer or 32-bit float) at its native rate.
pub fn read_wav(path: &Path) -> ReelResult<AudioPcm> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("open wav '{}'", path.display()))?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(ReelError::validation(format!(
            "wav '{}' declares no channels or a zero sample rate",
            path.display()
        )));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("read wav samples from '{}'", path.display()))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("read wav samples from '{}'", path.display()))?
        }
    };

    Ok(AudioPcm::new(spec.sample_rate, spec.channels, samples))
}

/// Decode any ffmpeg-readable audio file to stereo `f32` at `sample_rate`.
#[cfg(feature = "media-ffmpeg")]
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> ReelResult<AudioPcm> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .context("failed to run ffmpeg for audio decode")?;

    if !out.status.success() {
        return Err(ReelError::validation(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ReelError::validation(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let pcm = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(AudioPcm::new(sample_rate, 2, pcm))
}

/// Decode any ffmpeg-readable audio file to stereo `f32` at `sample_rate`.
#[cfg(not(feature = "media-ffmpeg"))]
pub fn decode_audio_f32_stereo(path: &Path, _sample_rate: u32) -> ReelResult<AudioPcm> {
    Err(ReelError::validation(format!(
        "decoding '{}' requires the 'media-ffmpeg' feature (only WAV is read natively)",
        path.display()
    )))
}

/// Whether an `ffmpeg` binary can be executed.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
