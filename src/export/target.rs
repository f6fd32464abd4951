use std::fmt;
use std::str::FromStr;

use crate::export::error::ExportError;

/// Aspect ratios the exporter can deliver, as `(width, height)` terms.
pub const SUPPORTED_ASPECTS: [(u32, u32); 6] = [(9, 16), (16, 9), (1, 1), (4, 5), (4, 3), (3, 4)];

/// Display aspect ratio, written `W:H`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Aspect {
    /// Horizontal term.
    pub w: u32,
    /// Vertical term.
    pub h: u32,
}

impl Aspect {
    /// Portrait 9:16.
    pub const PORTRAIT: Self = Self { w: 9, h: 16 };

    /// Whether the exporter supports this ratio.
    pub fn is_supported(self) -> bool {
        SUPPORTED_ASPECTS.contains(&(self.w, self.h))
    }

    /// Whether `width x height` has exactly this ratio.
    pub fn matches(self, width: u32, height: u32) -> bool {
        u64::from(width) * u64::from(self.h) == u64::from(height) * u64::from(self.w)
    }
}

impl Default for Aspect {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.w, self.h)
    }
}

impl FromStr for Aspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| format!("aspect '{s}' must be written W:H"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("aspect '{s}' must use positive integers"))
        };
        Ok(Self {
            w: parse(w)?,
            h: parse(h)?,
        })
    }
}

impl TryFrom<String> for Aspect {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Aspect> for String {
    fn from(value: Aspect) -> Self {
        value.to_string()
    }
}

/// How frames of a different shape are brought to the target size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Scale to fit inside, centre, pad with the background colour.
    #[default]
    Letterbox,
    /// Scale to cover, centre, crop the overflow.
    Crop,
}

/// Container written by the exporter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// H.264/AAC MP4 through the system `ffmpeg`.
    #[default]
    Mp4,
    /// Uncompressed YUV4MPEG2 4:4:4, video only, written natively.
    Y4m,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Y4m => "y4m",
        }
    }

    /// Format implied by a file extension, if recognised.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Some(Self::Mp4),
            "y4m" => Some(Self::Y4m),
            _ => None,
        }
    }
}

/// Delivery requirements for the exported file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    /// Output width in pixels (even).
    pub width: u32,
    /// Output height in pixels (even).
    pub height: u32,
    /// Declared aspect ratio; must match `width:height`.
    pub aspect: Aspect,
    /// Letterbox or crop.
    pub fit: FitPolicy,
    /// Container.
    pub format: OutputFormat,
    /// Padding and alpha flattening colour.
    pub background: [u8; 3],
    /// Refuse outputs longer than this.
    pub max_duration_secs: Option<f64>,
    /// Render frames on a rayon pool.
    pub parallel: bool,
    /// Frames rendered per batch between cancellation checks.
    pub chunk_size: usize,
    /// Worker threads for parallel rendering; rayon's default when unset.
    pub threads: Option<usize>,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            aspect: Aspect::PORTRAIT,
            fit: FitPolicy::Letterbox,
            format: OutputFormat::Mp4,
            background: [0, 0, 0],
            max_duration_secs: None,
            parallel: true,
            chunk_size: 32,
            threads: None,
        }
    }
}

impl TargetSpec {
    /// Check that the target can be produced without distortion.
    pub fn validate(&self) -> Result<(), ExportError> {
        if !self.aspect.is_supported() {
            return Err(ExportError::UnsupportedAspect {
                aspect: self.aspect.to_string(),
                supported: SUPPORTED_ASPECTS
                    .iter()
                    .map(|(w, h)| format!("{w}:{h}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(ExportError::InvalidTarget(
                "width and height must be non-zero".to_string(),
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(ExportError::InvalidTarget(format!(
                "{}x{} is not even in both dimensions (required for yuv420p output)",
                self.width, self.height
            )));
        }
        if !self.aspect.matches(self.width, self.height) {
            return Err(ExportError::InvalidTarget(format!(
                "{}x{} does not have the declared aspect {}",
                self.width, self.height, self.aspect
            )));
        }
        if let Some(max) = self.max_duration_secs
            && !(max.is_finite() && max > 0.0)
        {
            return Err(ExportError::InvalidTarget(
                "max_duration_secs must be a positive number".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ExportError::InvalidTarget(
                "threads must be >= 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn chunk_len(&self) -> u64 {
        self.chunk_size.max(1) as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/target.rs"]
mod tests;
