use super::*;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_half_transparent_white_on_black() {
    let out = over([0, 0, 0, 255], [128, 128, 128, 128], 1.0);
    assert_eq!(out, [128, 128, 128, 255]);
}

#[test]
fn crossfade_endpoints() {
    let a = [10, 20, 30, 40];
    let b = [200, 210, 220, 230];
    assert_eq!(crossfade(a, b, 0.0), a);
    assert_eq!(crossfade(a, b, 1.0), b);
}

#[test]
fn over_in_place_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(over_in_place(&mut dst, &[0u8; 4], 1.0).is_err());
}

#[test]
fn crossfade_in_place_blends_every_pixel() {
    let a = vec![0u8, 0, 0, 255, 0, 0, 0, 255];
    let b = vec![255u8, 255, 255, 255, 255, 255, 255, 255];
    let mut dst = vec![0u8; 8];
    crossfade_in_place(&mut dst, &a, &b, 1.0).unwrap();
    assert_eq!(dst, b);
}

#[test]
fn hard_wipe_reveals_incoming_from_the_left() {
    let (w, h) = (4u32, 1u32);
    let a = [0u8, 0, 0, 255].repeat(4);
    let b = [255u8, 255, 255, 255].repeat(4);
    let mut dst = vec![0u8; 16];
    wipe_in_place(
        &mut dst,
        &a,
        &b,
        WipeParams {
            width: w,
            height: h,
            t: 0.5,
            dir: WipeDir::LeftToRight,
            soft_edge: 0.0,
        },
    )
    .unwrap();
    assert_eq!(&dst[0..4], &[255, 255, 255, 255]);
    assert_eq!(&dst[4..8], &[255, 255, 255, 255]);
    assert_eq!(&dst[8..12], &[0, 0, 0, 255]);
    assert_eq!(&dst[12..16], &[0, 0, 0, 255]);
}

#[test]
fn wipe_rejects_wrong_sizes() {
    let mut dst = vec![0u8; 4];
    let params = WipeParams {
        width: 2,
        height: 1,
        t: 0.5,
        dir: WipeDir::TopToBottom,
        soft_edge: 0.1,
    };
    assert!(wipe_in_place(&mut dst, &[0u8; 4], &[0u8; 4], params).is_err());
}
