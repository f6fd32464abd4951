use super::*;
use crate::export::sink::{FrameSink, SinkConfig};
use crate::export::y4m::Y4mSink;
use crate::foundation::core::FrameRGBA;

fn write_y4m(path: &Path, frames: u64) {
    let mut sink = Y4mSink::new(path);
    sink.begin(SinkConfig {
        width: 6,
        height: 4,
        fps: Fps::whole(5).unwrap(),
        background: [0, 0, 0],
        audio: None,
    })
    .unwrap();
    for i in 0..frames {
        sink.push_frame(i, &FrameRGBA::solid(6, 4, [i as u8, 9, 9]))
            .unwrap();
    }
    sink.end().unwrap();
}

#[test]
fn counts_frames_written_by_the_y4m_sink() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.y4m");
    write_y4m(&path, 7);

    let len = measure_encoded(&path, OutputFormat::Y4m, Fps::whole(5).unwrap()).unwrap();
    assert_eq!(len.frames, 7);
    assert!((len.video_secs - 1.4).abs() < 1e-12);
    assert_eq!(len.audio_secs, None);
}

#[test]
fn header_only_file_has_no_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.y4m");
    std::fs::write(&path, b"YUV4MPEG2 W6 H4 F5:1 Ip A1:1 C444\n").unwrap();
    assert_eq!(count_y4m_frames(&path).unwrap(), 0);
}

#[test]
fn truncated_last_frame_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cut.y4m");
    write_y4m(&path, 3);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

    let err = count_y4m_frames(&path).unwrap_err();
    assert!(err.to_string().contains("truncated"), "{err}");
}

#[test]
fn frame_size_follows_the_colour_space() {
    assert_eq!(y4m_frame_bytes("YUV4MPEG2 W6 H4 F5:1 C444").unwrap(), 72);
    assert_eq!(y4m_frame_bytes("YUV4MPEG2 W6 H4 F5:1 C420jpeg").unwrap(), 36);
    assert_eq!(y4m_frame_bytes("YUV4MPEG2 W5 H3 F5:1").unwrap(), 15 + 2 * 6);
    assert_eq!(y4m_frame_bytes("YUV4MPEG2 W6 H4 C422").unwrap(), 48);
    assert_eq!(y4m_frame_bytes("YUV4MPEG2 W6 H4 Cmono").unwrap(), 24);
    assert!(y4m_frame_bytes("YUV4MPEG2 H4").is_err());
    assert!(y4m_frame_bytes("RIFF W6 H4").is_err());
}

#[test]
fn garbage_between_frames_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.y4m");
    let mut bytes = b"YUV4MPEG2 W2 H2 C444\n".to_vec();
    bytes.extend_from_slice(b"FRAME\n");
    bytes.extend_from_slice(&[0u8; 12]);
    bytes.extend_from_slice(b"JUNK\n");
    std::fs::write(&path, bytes).unwrap();

    assert!(count_y4m_frames(&path).is_err());
}
