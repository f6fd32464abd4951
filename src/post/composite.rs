use crate::foundation::math::{mul_div255_u8, smoothstep, unit_to_u8_weight};
use crate::post::error::PostProcessError;

pub(crate) type PremulRgba8 = [u8; 4];

/// Source-over of one premultiplied pixel onto another.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = unit_to_u8_weight(opacity);
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Linear blend from `a` (t = 0) to `b` (t = 1).
pub(crate) fn crossfade(a: PremulRgba8, b: PremulRgba8, t: f32) -> PremulRgba8 {
    let tt = unit_to_u8_weight(t);
    let it = 255u16 - tt;

    let mut out = [0u8; 4];
    for i in 0..4 {
        let av = mul_div255_u8(u16::from(a[i]), it);
        let bv = mul_div255_u8(u16::from(b[i]), tt);
        out[i] = av.saturating_add(bv);
    }
    out
}

/// Composite `src` over `dst` in place; both must be equal-length RGBA8 buffers.
pub(crate) fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> Result<(), PostProcessError> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(PostProcessError::Composite(
            "over_in_place expects equal-length rgba8 buffers".to_string(),
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Replace `dst` with the crossfade of `a` and `b` at `t`.
pub(crate) fn crossfade_in_place(dst: &mut [u8], a: &[u8], b: &[u8], t: f32) -> Result<(), PostProcessError> {
    if dst.len() != a.len() || dst.len() != b.len() || !dst.len().is_multiple_of(4) {
        return Err(PostProcessError::Composite(
            "crossfade_in_place expects equal-length rgba8 buffers".to_string(),
        ));
    }
    for ((d, a), b) in dst
        .chunks_exact_mut(4)
        .zip(a.chunks_exact(4))
        .zip(b.chunks_exact(4))
    {
        let out = crossfade([a[0], a[1], a[2], a[3]], [b[0], b[1], b[2], b[3]], t);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Direction the incoming frame is revealed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WipeDir {
    /// Reveal from the left edge.
    LeftToRight,
    /// Reveal from the right edge.
    RightToLeft,
    /// Reveal from the top edge.
    TopToBottom,
    /// Reveal from the bottom edge.
    BottomToTop,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct WipeParams {
    pub width: u32,
    pub height: u32,
    pub t: f32,
    pub dir: WipeDir,
    pub soft_edge: f32,
}

/// Write into `dst` the wipe from `a` to `b` at progress `params.t`.
pub(crate) fn wipe_in_place(
    dst: &mut [u8],
    a: &[u8],
    b: &[u8],
    params: WipeParams,
) -> Result<(), PostProcessError> {
    let WipeParams {
        width,
        height,
        t,
        dir,
        soft_edge,
    } = params;
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| PostProcessError::Composite("wipe buffer size overflow".to_string()))?;

    if dst.len() != expected_len || a.len() != expected_len || b.len() != expected_len {
        return Err(PostProcessError::Composite(
            "wipe_in_place expects buffers matching width*height*4".to_string(),
        ));
    }

    let t = t.clamp(0.0, 1.0);
    let axis_len = match dir {
        WipeDir::LeftToRight | WipeDir::RightToLeft => width as f32,
        WipeDir::TopToBottom | WipeDir::BottomToTop => height as f32,
    };
    let soft_px = soft_edge.max(0.0) * axis_len;

    let edge = t * (axis_len + 2.0 * soft_px) - soft_px;
    let a_edge = edge - soft_px;
    let b_edge = edge + soft_px;

    for y in 0..height {
        for x in 0..width {
            let pos = match dir {
                WipeDir::LeftToRight => x as f32,
                WipeDir::RightToLeft => (width - 1 - x) as f32,
                WipeDir::TopToBottom => y as f32,
                WipeDir::BottomToTop => (height - 1 - y) as f32,
            };

            let m = if soft_px <= 0.0 {
                if pos < edge { 1.0 } else { 0.0 }
            } else {
                1.0 - smoothstep(a_edge, b_edge, pos)
            };

            let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
            let ap = [a[idx], a[idx + 1], a[idx + 2], a[idx + 3]];
            let bp = [b[idx], b[idx + 1], b[idx + 2], b[idx + 3]];
            dst[idx..idx + 4].copy_from_slice(&crossfade(ap, bp, m));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/post/composite.rs"]
mod tests;
