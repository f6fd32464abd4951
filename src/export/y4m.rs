use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::export::error::ExportError;
use crate::export::sink::{FrameSink, SinkConfig, check_frame, flatten_premul_over_bg};
use crate::foundation::core::FrameRGBA;

/// Writes uncompressed YUV4MPEG2 (4:4:4, BT.601 limited range). Audio is ignored.
pub struct Y4mSink {
    out_path: PathBuf,
    out: Option<BufWriter<File>>,
    cfg: Option<SinkConfig>,
    scratch: Vec<u8>,
    planes: Vec<u8>,
    written: u64,
}

impl std::fmt::Debug for Y4mSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Y4mSink")
            .field("out_path", &self.out_path)
            .field("written", &self.written)
            .finish()
    }
}

impl Y4mSink {
    /// Sink writing to `out_path`, truncating it on `begin`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            out: None,
            cfg: None,
            scratch: Vec::new(),
            planes: Vec::new(),
            written: 0,
        }
    }
}

impl FrameSink for Y4mSink {
    fn begin(&mut self, cfg: SinkConfig) -> Result<(), ExportError> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ExportError::encode("y4m sink width/height must be non-zero"));
        }
        if cfg.audio.is_some() {
            tracing::debug!("y4m output carries no audio; mix ignored");
        }
        let file = File::create(&self.out_path).map_err(|e| {
            ExportError::io(format!("create '{}'", self.out_path.display()), e)
        })?;
        let mut out = BufWriter::new(file);
        writeln!(
            out,
            "YUV4MPEG2 W{} H{} F{}:{} Ip A1:1 C444",
            cfg.width, cfg.height, cfg.fps.num, cfg.fps.den
        )
        .map_err(|e| ExportError::io("write y4m header", e))?;

        let px = cfg.width as usize * cfg.height as usize;
        self.scratch = vec![0u8; px * 4];
        self.planes = vec![0u8; px * 3];
        self.out = Some(out);
        self.cfg = Some(cfg);
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> Result<(), ExportError> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ExportError::encode("y4m sink not started"))?;
        check_frame(cfg, idx, self.written, frame)?;
        flatten_premul_over_bg(&mut self.scratch, &frame.data, cfg.background)?;
        rgba_to_yuv444_planes(&self.scratch, &mut self.planes);

        let out = self
            .out
            .as_mut()
            .ok_or_else(|| ExportError::encode("y4m sink is already finalized"))?;
        out.write_all(b"FRAME\n")
            .and_then(|_| out.write_all(&self.planes))
            .map_err(|e| ExportError::io(format!("write y4m frame {idx}"), e))?;
        self.written += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<u64, ExportError> {
        let mut out = self
            .out
            .take()
            .ok_or_else(|| ExportError::encode("y4m sink not started"))?;
        out.flush()
            .map_err(|e| ExportError::io("flush y4m output", e))?;
        out.get_ref()
            .sync_all()
            .map_err(|e| ExportError::io("sync y4m output", e))?;
        self.cfg = None;
        Ok(self.written)
    }
}

/// Opaque RGBA8 to planar Y, U, V.
pub(crate) fn rgba_to_yuv444_planes(rgba: &[u8], planes: &mut [u8]) {
    let px = rgba.len() / 4;
    let (y_plane, rest) = planes.split_at_mut(px);
    let (u_plane, v_plane) = rest.split_at_mut(px);
    for (i, p) in rgba.chunks_exact(4).enumerate() {
        let (r, g, b) = (i32::from(p[0]), i32::from(p[1]), i32::from(p[2]));
        y_plane[i] = (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8;
        u_plane[i] = (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128) as u8;
        v_plane[i] = (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/y4m.rs"]
mod tests;
