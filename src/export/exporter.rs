use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::export::error::ExportError;
use crate::export::ffmpeg::FfmpegSink;
use crate::export::fit::fit_frame;
use crate::export::measure::{EncodedLength, measure_encoded};
use crate::export::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::export::target::{FitPolicy, OutputFormat, TargetSpec};
use crate::export::y4m::Y4mSink;
use crate::assets::MIX_SAMPLE_RATE;
use crate::foundation::core::FrameRGBA;
use crate::pipeline::CancelToken;
use crate::post::CompositedTimeline;

/// Priming plus tail padding of two AAC frames at the mix rate.
const AAC_PADDING_SECS: f64 = 2048.0 / MIX_SAMPLE_RATE as f64;

/// What an export produced.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ExportReport {
    /// Final file location.
    pub path: PathBuf,
    /// Frames found in the encoded file.
    pub frames: u64,
    /// Encoded frames divided by the frame rate.
    pub duration_secs: f64,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Container.
    pub format: OutputFormat,
    /// Fit policy applied to every frame.
    pub fit: FitPolicy,
    /// Whether an audio stream was muxed.
    pub audio: bool,
}

/// Encodes a composited timeline into a delivery file.
///
/// The file is written under a temporary name in the destination directory, read back, and renamed
/// into place only once its measured duration has been verified, so `dest` never holds a partial
/// file.
#[derive(Clone, Copy, Debug, Default)]
pub struct Exporter;

impl Exporter {
    /// New exporter.
    pub fn new() -> Self {
        Self
    }

    /// Encode `timeline` to `dest` according to `target`.
    #[tracing::instrument(skip_all, fields(dest = %dest.display(), format = ?target.format))]
    pub fn export(
        &self,
        timeline: &CompositedTimeline,
        target: &TargetSpec,
        dest: &Path,
        cancel: &CancelToken,
    ) -> Result<ExportReport, ExportError> {
        self.export_with(timeline, target, dest, cancel, |format, path| -> Box<dyn FrameSink> {
            match format {
                OutputFormat::Mp4 => Box::new(FfmpegSink::new(path)),
                OutputFormat::Y4m => Box::new(Y4mSink::new(path)),
            }
        })
    }

    /// [`Exporter::export`] with the sink for the staged file supplied by `open_sink`.
    pub(crate) fn export_with(
        &self,
        timeline: &CompositedTimeline,
        target: &TargetSpec,
        dest: &Path,
        cancel: &CancelToken,
        open_sink: impl FnOnce(OutputFormat, &Path) -> Box<dyn FrameSink>,
    ) -> Result<ExportReport, ExportError> {
        target.validate()?;
        check_length(timeline, target)?;

        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| ExportError::io(format!("create output directory '{}'", dir.display()), e))?;

        let staged = tempfile::Builder::new()
            .prefix(".storyreel-")
            .suffix(&format!(".{}", target.format.extension()))
            .tempfile_in(&dir)
            .map_err(|e| ExportError::io(format!("create temporary file in '{}'", dir.display()), e))?;

        // Kept alive until the encoder has exited; deleted on drop.
        let mut audio_file = None;
        let audio = match (target.format, timeline.audio()) {
            (OutputFormat::Mp4, Some(mix)) => {
                let file = tempfile::Builder::new()
                    .prefix(".storyreel-audio-")
                    .suffix(".f32le")
                    .tempfile_in(&dir)
                    .map_err(|e| ExportError::io("create temporary audio file", e))?;
                mix.write_f32le(file.path())
                    .map_err(|e| ExportError::encode(format!("write audio mix: {e}")))?;
                let cfg = AudioInputConfig {
                    path: file.path().to_path_buf(),
                    sample_rate: mix.sample_rate,
                    channels: mix.channels,
                };
                audio_file = Some(file);
                Some(cfg)
            }
            (OutputFormat::Y4m, Some(_)) => {
                tracing::info!("y4m output has no audio stream; mix not written");
                None
            }
            (_, None) => None,
        };
        let has_audio = audio.is_some();

        let mut sink = open_sink(target.format, staged.path());
        let pushed = self.encode(timeline, target, audio, sink.as_mut(), cancel)?;
        drop(sink);
        drop(audio_file);

        let measured = measure_encoded(staged.path(), target.format, timeline.fps())?;
        if measured.frames != pushed {
            tracing::warn!(pushed, found = measured.frames, "encoder changed the frame count");
        }
        let duration_secs = check_encoded(timeline, target, &measured)?;
        let frames = measured.frames;

        if let Some(reason) = cancel.reason() {
            return Err(ExportError::Cancelled(reason));
        }
        staged
            .persist(dest)
            .map_err(|e| ExportError::io(format!("move output into '{}'", dest.display()), e.error))?;

        tracing::info!(frames, duration_secs, "export complete");
        Ok(ExportReport {
            path: dest.to_path_buf(),
            frames,
            duration_secs,
            width: target.width,
            height: target.height,
            format: target.format,
            fit: target.fit,
            audio: has_audio,
        })
    }

    /// Stream every frame of `timeline`, fitted to `target`, into `sink`.
    ///
    /// Frames are rendered in batches of `target.chunk_size` (in parallel when enabled) and pushed
    /// in order; cancellation is checked before each batch.
    pub fn encode(
        &self,
        timeline: &CompositedTimeline,
        target: &TargetSpec,
        audio: Option<AudioInputConfig>,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> Result<u64, ExportError> {
        target.validate()?;
        let total = timeline.total_frames();
        if total == 0 {
            return Err(ExportError::EmptyTimeline);
        }

        let pool = if target.parallel {
            Some(build_thread_pool(target.threads)?)
        } else {
            None
        };

        sink.begin(SinkConfig {
            width: target.width,
            height: target.height,
            fps: timeline.fps(),
            background: target.background,
            audio,
        })?;

        let render = |idx: u64| -> Result<FrameRGBA, ExportError> {
            let frame = timeline
                .render_frame(idx)
                .map_err(|source| ExportError::Render { frame: idx, source })?;
            fit_frame(&frame, target.width, target.height, target.fit, target.background)
        };

        let chunk = target.chunk_len();
        let mut start = 0u64;
        while start < total {
            if let Some(reason) = cancel.reason() {
                tracing::warn!(frame = start, %reason, "export cancelled");
                return Err(ExportError::Cancelled(reason));
            }
            let end = (start + chunk).min(total);
            let frames: Vec<FrameRGBA> = match &pool {
                Some(pool) => pool.install(|| {
                    (start as usize..end as usize)
                        .into_par_iter()
                        .map(|i| render(i as u64))
                        .collect::<Result<Vec<_>, _>>()
                })?,
                None => (start..end).map(render).collect::<Result<Vec<_>, _>>()?,
            };
            for (idx, frame) in (start..end).zip(frames.iter()) {
                sink.push_frame(idx, frame)?;
            }
            tracing::debug!(done = end, total, "frames encoded");
            start = end;
        }

        sink.end()
    }
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, ExportError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ExportError::encode(format!("failed to build rayon thread pool: {e}")))
}

fn check_length(timeline: &CompositedTimeline, target: &TargetSpec) -> Result<(), ExportError> {
    if timeline.total_frames() == 0 {
        return Err(ExportError::EmptyTimeline);
    }
    if let Some(max_secs) = target.max_duration_secs {
        let duration_secs = timeline.total_duration_secs();
        if duration_secs > max_secs + timeline.fps().frame_duration_secs() {
            return Err(ExportError::TooLong {
                duration_secs,
                max_secs,
            });
        }
    }
    Ok(())
}

/// Encoded duration, if it agrees with the timeline within one frame interval.
///
/// An audio stream may additionally overhang by its codec's frame padding.
fn check_encoded(
    timeline: &CompositedTimeline,
    target: &TargetSpec,
    measured: &EncodedLength,
) -> Result<f64, ExportError> {
    let fps = timeline.fps();
    let encoded_secs = measured.video_secs;
    let expected_secs = timeline.total_duration_secs();
    let tolerance_secs = fps.frame_duration_secs();
    if (encoded_secs - expected_secs).abs() > tolerance_secs + 1e-9 {
        return Err(ExportError::DurationMismatch {
            encoded_secs,
            expected_secs,
            tolerance_secs,
        });
    }
    if let Some(audio_secs) = measured.audio_secs {
        let audio_tolerance = tolerance_secs + AAC_PADDING_SECS;
        if (audio_secs - expected_secs).abs() > audio_tolerance {
            return Err(ExportError::DurationMismatch {
                encoded_secs: audio_secs,
                expected_secs,
                tolerance_secs: audio_tolerance,
            });
        }
    }
    if let Some(max_secs) = target.max_duration_secs
        && encoded_secs > max_secs + tolerance_secs
    {
        return Err(ExportError::TooLong {
            duration_secs: encoded_secs,
            max_secs,
        });
    }
    Ok(encoded_secs)
}

#[cfg(test)]
#[path = "../../tests/unit/export/exporter.rs"]
mod tests;
