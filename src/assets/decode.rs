use std::io::Cursor;
use std::path::Path;

use anyhow::Context;

use crate::foundation::core::FrameRGBA;
use crate::foundation::error::ReelResult;

/// Decode an encoded image (PNG, JPEG, ...) into a premultiplied frame.
pub fn decode_frame(bytes: &[u8]) -> ReelResult<FrameRGBA> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    FrameRGBA::from_raw(width, height, data)
}

/// Encode a frame as PNG bytes.
///
/// Frames written here are expected to be opaque, where premultiplied and straight alpha agree.
pub fn encode_png(frame: &FrameRGBA) -> ReelResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("frame buffer does not match its dimensions")?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

/// Read and decode an image file.
pub fn read_frame(path: &Path) -> ReelResult<FrameRGBA> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_frame(&bytes)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
