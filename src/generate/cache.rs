use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::decode::{encode_png, read_frame};
use crate::generate::generator::RawClip;
use crate::generate::model::GenerationRequest;

/// On-disk cache of generated clips keyed by request.
///
/// Layout: `<root>/<xxh3 of request json>/meta.json` plus `frame_NNNN.png`. Cache problems are
/// logged and treated as misses; they never fail a generation.
#[derive(Clone, Debug)]
pub struct ClipCache {
    root: PathBuf,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CacheMeta {
    frame_rate: f64,
    frames: usize,
    width: u32,
    height: u32,
}

impl ClipCache {
    /// Cache rooted at `root`; created lazily on first store.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable key for `request`.
    pub fn key(request: &GenerationRequest) -> String {
        let json = serde_json::to_vec(request).unwrap_or_default();
        format!("{:016x}", xxhash_rust::xxh3::xxh3_64(&json))
    }

    fn entry_dir(&self, request: &GenerationRequest) -> PathBuf {
        self.root.join(Self::key(request))
    }

    /// Load the clip for `request`, if a complete entry exists.
    pub fn load(&self, request: &GenerationRequest) -> Option<RawClip> {
        let dir = self.entry_dir(request);
        let meta_path = dir.join("meta.json");
        if !meta_path.is_file() {
            return None;
        }
        match read_entry(&dir) {
            Ok(clip) => Some(RawClip {
                scene_index: request.scene_index,
                ..clip
            }),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "ignoring unreadable clip cache entry");
                None
            }
        }
    }

    /// Store `clip` for `request`, replacing any existing entry.
    pub fn store(&self, request: &GenerationRequest, clip: &RawClip) {
        let dir = self.entry_dir(request);
        if let Err(e) = write_entry(&self.root, &dir, clip) {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to write clip cache entry");
        }
    }
}

fn frame_path(dir: &Path, i: usize) -> PathBuf {
    dir.join(format!("frame_{i:04}.png"))
}

fn read_entry(dir: &Path) -> anyhow::Result<RawClip> {
    let meta: CacheMeta = serde_json::from_slice(&std::fs::read(dir.join("meta.json"))?)?;
    if meta.frames == 0 || !meta.frame_rate.is_finite() || meta.frame_rate <= 0.0 {
        anyhow::bail!("cache metadata is invalid");
    }
    let mut frames = Vec::with_capacity(meta.frames);
    for i in 0..meta.frames {
        let frame = read_frame(&frame_path(dir, i))?;
        if frame.width != meta.width || frame.height != meta.height {
            anyhow::bail!("cached frame {i} has unexpected dimensions");
        }
        frames.push(Arc::new(frame));
    }
    Ok(RawClip {
        scene_index: 0,
        frames,
        native_frame_rate: meta.frame_rate,
    })
}

fn write_entry(root: &Path, dir: &Path, clip: &RawClip) -> anyhow::Result<()> {
    let Some((width, height)) = clip.dimensions() else {
        anyhow::bail!("refusing to cache an empty clip");
    };
    std::fs::create_dir_all(root)?;
    // Build the entry beside its final location, then rename it into place.
    let staging = tempfile::tempdir_in(root)?;
    for (i, frame) in clip.frames.iter().enumerate() {
        std::fs::write(frame_path(staging.path(), i), encode_png(frame)?)?;
    }
    let meta = CacheMeta {
        frame_rate: clip.native_frame_rate,
        frames: clip.frames.len(),
        width,
        height,
    };
    std::fs::write(staging.path().join("meta.json"), serde_json::to_vec(&meta)?)?;

    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    let staged = staging.keep();
    if let Err(e) = std::fs::rename(&staged, dir) {
        let _ = std::fs::remove_dir_all(&staged);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/generate/cache.rs"]
mod tests;
