use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::export::error::ExportError;
use crate::export::target::FitPolicy;
use crate::foundation::core::FrameRGBA;

/// Scale `frame` uniformly to `width x height` under `fit`.
///
/// Premultiplied pixels are filtered as-is. Letterbox bars are opaque `background`.
pub(crate) fn fit_frame(
    frame: &FrameRGBA,
    width: u32,
    height: u32,
    fit: FitPolicy,
    background: [u8; 3],
) -> Result<FrameRGBA, ExportError> {
    if frame.width == width && frame.height == height {
        return Ok(frame.clone());
    }
    let (sw, sh) = (frame.width, frame.height);
    let src = RgbaImage::from_raw(sw, sh, frame.data.clone())
        .ok_or_else(|| ExportError::encode(format!("frame buffer does not hold {sw}x{sh} rgba8")))?;

    let sx = f64::from(width) / f64::from(sw);
    let sy = f64::from(height) / f64::from(sh);
    let scaled_dim = |len: u32, scale: f64| ((f64::from(len) * scale).round() as u32).max(1);

    let data = match fit {
        FitPolicy::Letterbox => {
            let s = sx.min(sy);
            let nw = scaled_dim(sw, s).min(width);
            let nh = scaled_dim(sh, s).min(height);
            let scaled = imageops::resize(&src, nw, nh, FilterType::Triangle);
            let [r, g, b] = background;
            let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
            imageops::replace(
                &mut canvas,
                &scaled,
                i64::from((width - nw) / 2),
                i64::from((height - nh) / 2),
            );
            canvas.into_raw()
        }
        FitPolicy::Crop => {
            let s = sx.max(sy);
            let nw = scaled_dim(sw, s).max(width);
            let nh = scaled_dim(sh, s).max(height);
            let scaled = imageops::resize(&src, nw, nh, FilterType::Triangle);
            imageops::crop_imm(&scaled, (nw - width) / 2, (nh - height) / 2, width, height)
                .to_image()
                .into_raw()
        }
    };

    FrameRGBA::from_raw(width, height, data).map_err(|e| ExportError::encode(e.to_string()))
}

#[cfg(test)]
#[path = "../../tests/unit/export/fit.rs"]
mod tests;
