use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::assemble::{AssembledTimeline, SceneRange};
use crate::assets::media::{AudioPcm, MIX_SAMPLE_RATE, ensure_parent_dir};
use crate::foundation::core::Fps;
use crate::foundation::error::ReelResult;
use crate::post::error::PostProcessError;

/// Where a track sits on the timeline.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioAnchor {
    /// Starts at an absolute time and runs until it ends or the timeline does.
    Timeline {
        /// Start time in seconds.
        start_secs: f64,
    },
    /// Starts with the first scene of the range and is cut at the end of the last.
    Scenes(SceneRange),
}

/// One input to the mix.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTrack {
    /// Name used in logs and issues.
    pub label: String,
    /// Source samples.
    pub pcm: AudioPcm,
    /// Linear gain.
    pub gain: f32,
    /// Placement.
    pub anchor: AudioAnchor,
}

/// Final stereo mix covering the whole timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedAudio {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Always 2.
    pub channels: u16,
    /// Interleaved samples, clamped to `[-1, 1]`.
    pub samples: Arc<Vec<f32>>,
}

impl MixedAudio {
    /// Sample frames in the mix.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Mix length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate.max(1))
    }

    /// Whether any sample is non-zero.
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == 0.0)
    }

    /// Write raw little-endian `f32` samples (ffmpeg `-f f32le`).
    pub fn write_f32le(&self, out_path: &Path) -> ReelResult<()> {
        ensure_parent_dir(out_path)?;
        let mut bytes = Vec::<u8>::with_capacity(self.samples.len() * 4);
        for &sample in self.samples.iter() {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        std::fs::write(out_path, bytes)
            .with_context(|| format!("write mixed audio '{}'", out_path.display()))?;
        Ok(())
    }
}

/// Timeline frame offset to a sample offset, rounded to nearest.
pub(crate) fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

struct Placement {
    start_sample: u64,
    end_sample: u64,
}

fn place(
    track: &AudioTrack,
    timeline: &AssembledTimeline,
    total_samples: u64,
) -> Result<Placement, PostProcessError> {
    let drop = |detail: String| PostProcessError::Audio {
        label: track.label.clone(),
        detail,
    };
    if !track.gain.is_finite() || track.gain < 0.0 {
        return Err(drop(format!("gain {} is not a finite non-negative number", track.gain)));
    }
    if track.pcm.sample_rate == 0 || track.pcm.channels == 0 || track.pcm.is_empty() {
        return Err(drop("track has no samples".to_string()));
    }

    match &track.anchor {
        AudioAnchor::Timeline { start_secs } => {
            if !start_secs.is_finite() || *start_secs < 0.0 {
                return Err(drop(format!("start {start_secs} is not a valid time")));
            }
            let start_sample = (start_secs * f64::from(MIX_SAMPLE_RATE)).round() as u64;
            if start_sample >= total_samples {
                return Err(drop(format!(
                    "starts at {start_secs:.3}s, after the timeline ends"
                )));
            }
            Ok(Placement {
                start_sample,
                end_sample: total_samples,
            })
        }
        AudioAnchor::Scenes(range) => {
            let frames = timeline.frames_for_range(*range).ok_or_else(|| {
                PostProcessError::InvalidAnchor {
                    layer: format!("audio track '{}'", track.label),
                    anchor: *range,
                    scenes: timeline.scene_count(),
                }
            })?;
            Ok(Placement {
                start_sample: frame_to_sample(frames.start, timeline.fps, MIX_SAMPLE_RATE),
                end_sample: frame_to_sample(frames.end, timeline.fps, MIX_SAMPLE_RATE)
                    .min(total_samples),
            })
        }
    }
}

/// Mix `tracks` onto the timeline's time axis at 48 kHz stereo.
///
/// Each track is resampled linearly, scaled by its gain, truncated at its anchor end and
/// silent outside it. Overlapping tracks are summed and clipped to `[-1, 1]`. Tracks that cannot
/// be placed are skipped and reported in `issues`.
pub(crate) fn mix_tracks(
    timeline: &AssembledTimeline,
    tracks: &[AudioTrack],
    issues: &mut Vec<PostProcessError>,
) -> MixedAudio {
    let channels = 2usize;
    let total_samples = frame_to_sample(timeline.total_frames(), timeline.fps, MIX_SAMPLE_RATE);
    let mut out = vec![0.0f32; total_samples as usize * channels];

    for track in tracks {
        let placement = match place(track, timeline, total_samples) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(track = %track.label, error = %e, "audio track dropped");
                issues.push(e);
                continue;
            }
        };
        if track.gain == 0.0 {
            continue;
        }

        let src = track.pcm.interleaved_f32.as_ref();
        let src_channels = usize::from(track.pcm.channels);
        let src_frames = track.pcm.frames();
        let src_rate = f64::from(track.pcm.sample_rate);

        for dst_sample in placement.start_sample..placement.end_sample {
            let rel_sec = ((dst_sample - placement.start_sample) as f64) / f64::from(MIX_SAMPLE_RATE);
            let src_pos = rel_sec * src_rate;
            let src_frame0 = src_pos.floor() as usize;
            if src_frame0 >= src_frames {
                break;
            }
            let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
            let frac = (src_pos - src_frame0 as f64) as f32;

            let (l, r) = if src_channels == 1 {
                let v0 = src[src_frame0];
                let v1 = src[src_frame1];
                let v = v0 + ((v1 - v0) * frac);
                (v, v)
            } else {
                let i0 = src_frame0 * src_channels;
                let i1 = src_frame1 * src_channels;
                (
                    src[i0] + ((src[i1] - src[i0]) * frac),
                    src[i0 + 1] + ((src[i1 + 1] - src[i0 + 1]) * frac),
                )
            };

            let dst_idx = dst_sample as usize * channels;
            out[dst_idx] += l * track.gain;
            out[dst_idx + 1] += r * track.gain;
        }
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    MixedAudio {
        sample_rate: MIX_SAMPLE_RATE,
        channels: channels as u16,
        samples: Arc::new(out),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/post/audio.rs"]
mod tests;
