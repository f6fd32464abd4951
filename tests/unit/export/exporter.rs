use super::*;
use crate::assemble::{AssembledTimeline, TimelineClip};
use crate::export::measure::EncodedLength;
use crate::export::sink::InMemorySink;
use crate::export::target::Aspect;
use crate::foundation::core::Fps;
use crate::pipeline::CancelReason;
use std::sync::Arc;

fn timeline(frames: usize, size: u32) -> CompositedTimeline {
    let fps = Fps::whole(10).unwrap();
    let clip = TimelineClip {
        scene_index: 0,
        frames: (0..frames)
            .map(|i| Arc::new(FrameRGBA::solid(size, size, [i as u8, 0, 0])))
            .collect(),
        target_frame_rate: fps,
        start_offset_seconds: 0.0,
        start_frame: 0,
    };
    CompositedTimeline::from_assembled(AssembledTimeline {
        fps,
        total_duration_seconds: fps.frames_to_secs(frames as u64),
        clips: vec![clip],
    })
}

fn square_y4m(size: u32) -> TargetSpec {
    TargetSpec {
        width: size,
        height: size,
        aspect: Aspect { w: 1, h: 1 },
        format: OutputFormat::Y4m,
        chunk_size: 3,
        ..TargetSpec::default()
    }
}

fn leftovers(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(".storyreel-"))
        .collect()
}

#[test]
fn y4m_export_lands_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nested").join("reel.y4m");

    let report = Exporter::new()
        .export(&timeline(10, 4), &square_y4m(4), &dest, &CancelToken::new())
        .unwrap();

    assert_eq!(report.frames, 10);
    assert!((report.duration_secs - 1.0).abs() < 1e-12);
    assert_eq!(report.path, dest);
    assert!(!report.audio);
    let bytes = std::fs::read(&dest).unwrap();
    assert!(bytes.starts_with(b"YUV4MPEG2 W4 H4 F10:1"));
    assert!(leftovers(dest.parent().unwrap()).is_empty());
}

#[test]
fn frames_are_fitted_to_the_target() {
    let mut sink = InMemorySink::new();
    let target = TargetSpec {
        fit: FitPolicy::Letterbox,
        background: [0, 0, 255],
        ..square_y4m(8)
    };
    let tl = {
        let fps = Fps::whole(10).unwrap();
        CompositedTimeline::from_assembled(AssembledTimeline {
            fps,
            total_duration_seconds: 0.2,
            clips: vec![TimelineClip {
                scene_index: 0,
                frames: vec![Arc::new(FrameRGBA::solid(16, 8, [255, 0, 0])); 2],
                target_frame_rate: fps,
                start_offset_seconds: 0.0,
                start_frame: 0,
            }],
        })
    };

    let written = Exporter::new()
        .encode(&tl, &target, None, &mut sink, &CancelToken::new())
        .unwrap();

    assert_eq!(written, 2);
    let frame = &sink.frames()[0];
    assert_eq!((frame.width, frame.height), (8, 8));
    assert_eq!(frame.pixel(0, 0), [0, 0, 255, 255]);
    assert_eq!(frame.pixel(0, 4), [255, 0, 0, 255]);
}

#[test]
fn parallel_and_sequential_encoding_agree() {
    let tl = timeline(17, 4);
    let mut par = InMemorySink::new();
    let mut seq = InMemorySink::new();
    let exporter = Exporter::new();
    let cancel = CancelToken::new();

    exporter
        .encode(&tl, &square_y4m(4), None, &mut par, &cancel)
        .unwrap();
    let sequential = TargetSpec {
        parallel: false,
        ..square_y4m(4)
    };
    exporter
        .encode(&tl, &sequential, None, &mut seq, &cancel)
        .unwrap();

    assert_eq!(par.frames(), seq.frames());
    for (i, f) in par.frames().iter().enumerate() {
        assert_eq!(f.pixel(0, 0)[0], i as u8);
    }
}

#[test]
fn cancellation_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("reel.y4m");
    std::fs::write(&dest, b"previous").unwrap();
    let cancel = CancelToken::new();
    cancel.cancel(CancelReason::Requested);

    let err = Exporter::new()
        .export(&timeline(10, 4), &square_y4m(4), &dest, &cancel)
        .unwrap_err();

    assert!(matches!(err, ExportError::Cancelled(CancelReason::Requested)));
    assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
    assert!(leftovers(dir.path()).is_empty());
}

#[test]
fn unsupported_aspect_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("reel.y4m");
    let target = TargetSpec {
        aspect: Aspect { w: 21, h: 9 },
        ..square_y4m(4)
    };

    let err = Exporter::new()
        .export(&timeline(10, 4), &target, &dest, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, ExportError::UnsupportedAspect { .. }));
    assert!(!dest.exists());
}

#[test]
fn max_duration_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let target = TargetSpec {
        max_duration_secs: Some(0.5),
        ..square_y4m(4)
    };
    let err = Exporter::new()
        .export(
            &timeline(10, 4),
            &target,
            &dir.path().join("long.y4m"),
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, ExportError::TooLong { .. }));
}

fn measured(frames: u64, audio_secs: Option<f64>) -> EncodedLength {
    EncodedLength {
        frames,
        video_secs: Fps::whole(10).unwrap().frames_to_secs(frames),
        audio_secs,
    }
}

#[test]
fn encoded_duration_must_match_within_one_frame() {
    let tl = timeline(10, 4);
    let target = square_y4m(4);
    assert!(check_encoded(&tl, &target, &measured(10, None)).is_ok());
    assert!(check_encoded(&tl, &target, &measured(9, None)).is_ok());
    assert!(matches!(
        check_encoded(&tl, &target, &measured(8, None)),
        Err(ExportError::DurationMismatch { .. })
    ));
}

#[test]
fn audio_stream_may_overhang_by_codec_padding_only() {
    let tl = timeline(10, 4);
    let target = square_y4m(4);
    assert!(check_encoded(&tl, &target, &measured(10, Some(1.02))).is_ok());
    assert!(matches!(
        check_encoded(&tl, &target, &measured(10, Some(1.5))),
        Err(ExportError::DurationMismatch { encoded_secs, .. }) if (encoded_secs - 1.5).abs() < 1e-12
    ));
}

/// Y4M sink that silently discards every `every`-th frame but reports all of them as written.
struct DroppingSink {
    inner: Y4mSink,
    every: u64,
    kept: u64,
    seen: u64,
}

impl FrameSink for DroppingSink {
    fn begin(&mut self, cfg: SinkConfig) -> Result<(), ExportError> {
        self.inner.begin(cfg)
    }

    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> Result<(), ExportError> {
        self.seen += 1;
        if (idx + 1).is_multiple_of(self.every) {
            return Ok(());
        }
        self.inner.push_frame(self.kept, frame)?;
        self.kept += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<u64, ExportError> {
        self.inner.end()?;
        Ok(self.seen)
    }
}

#[test]
fn short_encoded_file_is_rejected_and_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("reel.y4m");
    std::fs::write(&dest, b"previous").unwrap();

    let err = Exporter::new()
        .export_with(
            &timeline(10, 4),
            &square_y4m(4),
            &dest,
            &CancelToken::new(),
            |_, path| -> Box<dyn FrameSink> {
                Box::new(DroppingSink {
                    inner: Y4mSink::new(path),
                    every: 4,
                    kept: 0,
                    seen: 0,
                })
            },
        )
        .unwrap_err();

    match err {
        ExportError::DurationMismatch {
            encoded_secs,
            expected_secs,
            ..
        } => {
            assert!((encoded_secs - 0.8).abs() < 1e-12);
            assert!((expected_secs - 1.0).abs() < 1e-12);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
    assert!(leftovers(dir.path()).is_empty());
}

#[test]
fn report_counts_frames_read_back_from_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("reel.y4m");

    let report = Exporter::new()
        .export_with(
            &timeline(10, 4),
            &square_y4m(4),
            &dest,
            &CancelToken::new(),
            |_, path| -> Box<dyn FrameSink> {
                Box::new(DroppingSink {
                    inner: Y4mSink::new(path),
                    every: 10,
                    kept: 0,
                    seen: 0,
                })
            },
        )
        .unwrap();

    assert_eq!(report.frames, 9);
    assert!((report.duration_secs - 0.9).abs() < 1e-12);
    assert!(dest.exists());
}

#[test]
fn empty_timeline_is_rejected() {
    let fps = Fps::whole(10).unwrap();
    let empty = CompositedTimeline::from_assembled(AssembledTimeline {
        fps,
        total_duration_seconds: 0.0,
        clips: Vec::new(),
    });
    let mut sink = InMemorySink::new();
    assert!(matches!(
        Exporter::new().encode(&empty, &square_y4m(4), None, &mut sink, &CancelToken::new()),
        Err(ExportError::EmptyTimeline)
    ));
}

#[test]
fn mp4_export_when_ffmpeg_available() {
    let ffprobe = std::process::Command::new("ffprobe")
        .arg("-version")
        .output()
        .is_ok_and(|o| o.status.success());
    if !crate::assets::is_ffmpeg_on_path() || !ffprobe {
        eprintln!("skipping: ffmpeg or ffprobe not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("reel.mp4");
    let target = TargetSpec {
        format: OutputFormat::Mp4,
        ..square_y4m(16)
    };
    let report = Exporter::new()
        .export(&timeline(10, 16), &target, &dest, &CancelToken::new())
        .unwrap();
    assert_eq!(report.frames, 10);
    assert!(std::fs::metadata(&dest).unwrap().len() > 0);
}
