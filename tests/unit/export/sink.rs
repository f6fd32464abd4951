use super::*;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::whole(10).unwrap(),
        background: [0, 0, 0],
        audio: None,
    }
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg(&mut dst, &src, [10, 20, 30]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_half_alpha_mixes_background() {
    let src = vec![128u8, 0, 0, 128];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg(&mut dst, &src, [0, 0, 254]).unwrap();
    assert_eq!(dst, vec![128, 0, 127, 255]);
}

#[test]
fn flatten_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(flatten_premul_over_bg(&mut dst, &[0u8; 4], [0, 0, 0]).is_err());
}

#[test]
fn in_memory_sink_records_frames_in_order() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    sink.push_frame(0, &FrameRGBA::solid(2, 2, [1, 0, 0])).unwrap();
    sink.push_frame(1, &FrameRGBA::solid(2, 2, [2, 0, 0])).unwrap();
    assert_eq!(sink.end().unwrap(), 2);
    assert_eq!(sink.frames()[1].pixel(0, 0), [2, 0, 0, 255]);
    assert_eq!(sink.config(), Some(&cfg()));
}

#[test]
fn sinks_reject_out_of_order_and_wrong_size_frames() {
    let mut sink = InMemorySink::new();
    assert!(sink.push_frame(0, &FrameRGBA::solid(2, 2, [0, 0, 0])).is_err());
    sink.begin(cfg()).unwrap();
    assert!(sink.push_frame(1, &FrameRGBA::solid(2, 2, [0, 0, 0])).is_err());
    assert!(sink.push_frame(0, &FrameRGBA::solid(4, 2, [0, 0, 0])).is_err());
}
