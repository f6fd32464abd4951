use super::*;

const RED: [u8; 4] = [255, 0, 0, 255];

#[test]
fn same_size_is_untouched() {
    let frame = FrameRGBA::solid(4, 4, [1, 2, 3]);
    let out = fit_frame(&frame, 4, 4, FitPolicy::Crop, [0, 0, 0]).unwrap();
    assert_eq!(out, frame);
}

#[test]
fn letterbox_pads_wide_source_top_and_bottom() {
    // 16x8 into 8x8: scaled to 8x4, bars of 2 rows above and below.
    let frame = FrameRGBA::solid(16, 8, [255, 0, 0]);
    let out = fit_frame(&frame, 8, 8, FitPolicy::Letterbox, [0, 0, 255]).unwrap();
    assert_eq!((out.width, out.height), (8, 8));
    assert_eq!(out.pixel(4, 0), [0, 0, 255, 255]);
    assert_eq!(out.pixel(4, 1), [0, 0, 255, 255]);
    assert_eq!(out.pixel(4, 3), RED);
    assert_eq!(out.pixel(4, 4), RED);
    assert_eq!(out.pixel(4, 7), [0, 0, 255, 255]);
    assert_eq!(out.pixel(0, 3), RED);
}

#[test]
fn crop_fills_the_frame() {
    let frame = FrameRGBA::solid(16, 8, [255, 0, 0]);
    let out = fit_frame(&frame, 8, 8, FitPolicy::Crop, [0, 0, 255]).unwrap();
    assert!(out.data.chunks_exact(4).all(|p| p == RED));
}

#[test]
fn crop_keeps_the_centre() {
    // Left half green, right half red; a square crop of the centre shows both.
    let mut data = Vec::new();
    for _y in 0..4 {
        for x in 0..16 {
            data.extend_from_slice(if x < 8 { &[0, 255, 0, 255] } else { &RED });
        }
    }
    let frame = FrameRGBA::from_raw(16, 4, data).unwrap();
    let out = fit_frame(&frame, 4, 4, FitPolicy::Crop, [0, 0, 0]).unwrap();
    assert_eq!(out.pixel(0, 2), [0, 255, 0, 255]);
    assert_eq!(out.pixel(3, 2), RED);
}

#[test]
fn upscales_preserve_aspect() {
    let frame = FrameRGBA::solid(2, 4, [255, 0, 0]);
    let out = fit_frame(&frame, 8, 8, FitPolicy::Letterbox, [0, 0, 0]).unwrap();
    // 2x4 becomes 4x8, centred with two-column bars.
    assert_eq!(out.pixel(0, 4), [0, 0, 0, 255]);
    assert_eq!(out.pixel(2, 4), RED);
    assert_eq!(out.pixel(5, 4), RED);
    assert_eq!(out.pixel(7, 4), [0, 0, 0, 255]);
}
