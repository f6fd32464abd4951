use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::export::error::ExportError;
use crate::export::target::OutputFormat;
use crate::foundation::core::Fps;

/// Length of an encoded file, read back from disk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct EncodedLength {
    /// Video frames in the file.
    pub frames: u64,
    /// Video frames divided by the frame rate.
    pub video_secs: f64,
    /// Audio stream duration, when the file has one.
    pub audio_secs: Option<f64>,
}

/// Measure the file at `path` as written by the sink for `format`.
pub(crate) fn measure_encoded(
    path: &Path,
    format: OutputFormat,
    fps: Fps,
) -> Result<EncodedLength, ExportError> {
    match format {
        OutputFormat::Y4m => {
            let frames = count_y4m_frames(path)?;
            Ok(EncodedLength {
                frames,
                video_secs: fps.frames_to_secs(frames),
                audio_secs: None,
            })
        }
        OutputFormat::Mp4 => inspect_mp4(path, fps),
    }
}

/// Count complete `FRAME` records in a YUV4MPEG2 file.
pub(crate) fn count_y4m_frames(path: &Path) -> Result<u64, ExportError> {
    let file = File::open(path)
        .map_err(|e| ExportError::io(format!("open '{}' for verification", path.display()), e))?;
    let file_len = file
        .metadata()
        .map_err(|e| ExportError::io(format!("stat '{}'", path.display()), e))?
        .len();
    let mut reader = BufReader::new(file);

    let mut line = Vec::new();
    let header_len = read_line(&mut reader, &mut line, path)?;
    let header = String::from_utf8_lossy(&line).into_owned();
    let payload = y4m_frame_bytes(&header)?;

    let mut pos = header_len;
    let mut frames = 0u64;
    while pos < file_len {
        let n = read_line(&mut reader, &mut line, path)?;
        if !line.starts_with(b"FRAME") {
            return Err(ExportError::encode(format!(
                "y4m record {frames} in '{}' does not start with FRAME",
                path.display()
            )));
        }
        if pos + n + payload > file_len {
            return Err(ExportError::encode(format!(
                "y4m frame {frames} in '{}' is truncated",
                path.display()
            )));
        }
        let skip = i64::try_from(payload)
            .map_err(|_| ExportError::encode("y4m frame size overflows a seek offset"))?;
        reader
            .seek_relative(skip)
            .map_err(|e| ExportError::io(format!("seek in '{}'", path.display()), e))?;
        pos += n + payload;
        frames += 1;
    }
    Ok(frames)
}

fn read_line(reader: &mut impl BufRead, buf: &mut Vec<u8>, path: &Path) -> Result<u64, ExportError> {
    buf.clear();
    let n = reader
        .read_until(b'\n', buf)
        .map_err(|e| ExportError::io(format!("read '{}'", path.display()), e))?;
    if buf.last() != Some(&b'\n') {
        return Err(ExportError::encode(format!(
            "'{}' ends inside a y4m header line",
            path.display()
        )));
    }
    Ok(n as u64)
}

/// Payload size of one frame for a stream header.
fn y4m_frame_bytes(header: &str) -> Result<u64, ExportError> {
    let mut tokens = header.split_ascii_whitespace();
    if tokens.next() != Some("YUV4MPEG2") {
        return Err(ExportError::encode("missing YUV4MPEG2 signature"));
    }
    let (mut w, mut h, mut colour) = (None, None, "420");
    for tok in tokens {
        match tok.split_at_checked(1) {
            Some(("W", v)) => w = v.parse::<u64>().ok(),
            Some(("H", v)) => h = v.parse::<u64>().ok(),
            Some(("C", v)) => colour = v,
            _ => {}
        }
    }
    let (w, h) = w
        .zip(h)
        .ok_or_else(|| ExportError::encode("y4m header lacks W/H"))?;
    let luma = w * h;
    let chroma = if colour.starts_with("444") {
        2 * luma
    } else if colour.starts_with("422") {
        2 * w.div_ceil(2) * h
    } else if colour.starts_with("420") {
        2 * w.div_ceil(2) * h.div_ceil(2)
    } else if colour == "mono" {
        0
    } else {
        return Err(ExportError::encode(format!("unsupported y4m colour space C{colour}")));
    };
    Ok(luma + chroma)
}

fn inspect_mp4(path: &Path, fps: Fps) -> Result<EncodedLength, ExportError> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        nb_frames: Option<String>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
    }

    let out = std::process::Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| ExportError::encode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ExportError::encode(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ExportError::encode(format!("ffprobe json parse failed: {e}")))?;
    let seconds = |s: &ProbeStream| s.duration.as_deref().and_then(|d| d.parse::<f64>().ok());

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ExportError::encode("encoded file has no video stream"))?;
    let frames = match video.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
        Some(n) => n,
        None => {
            let secs = seconds(video)
                .ok_or_else(|| ExportError::encode("ffprobe reported neither frames nor duration"))?;
            fps.secs_to_frames_round(secs)
        }
    };
    let audio_secs = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .and_then(seconds);

    Ok(EncodedLength {
        frames,
        video_secs: fps.frames_to_secs(frames),
        audio_secs,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/export/measure.rs"]
mod tests;
