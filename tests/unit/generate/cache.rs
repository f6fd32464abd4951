use super::*;
use crate::foundation::core::FrameRGBA;

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest {
        scene_index: 2,
        prompt: prompt.to_string(),
        negative_prompt: None,
        width: 3,
        height: 2,
        num_frames: 2,
        num_inference_steps: 10,
        fps: 8,
        seed: Some(1),
    }
}

fn clip() -> RawClip {
    RawClip {
        scene_index: 2,
        frames: vec![
            Arc::new(FrameRGBA::solid(3, 2, [1, 2, 3])),
            Arc::new(FrameRGBA::solid(3, 2, [4, 5, 6])),
        ],
        native_frame_rate: 8.0,
    }
}

#[test]
fn key_depends_on_request_contents() {
    assert_eq!(ClipCache::key(&request("a")), ClipCache::key(&request("a")));
    assert_ne!(ClipCache::key(&request("a")), ClipCache::key(&request("b")));
    assert_eq!(ClipCache::key(&request("a")).len(), 16);
}

#[test]
fn stored_clip_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ClipCache::new(dir.path());
    let req = request("harbour");

    assert!(cache.load(&req).is_none());
    cache.store(&req, &clip());
    let loaded = cache.load(&req).unwrap();
    assert_eq!(loaded, clip());
}

#[test]
fn corrupt_entry_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ClipCache::new(dir.path());
    let req = request("harbour");
    cache.store(&req, &clip());

    let entry = dir.path().join(ClipCache::key(&req));
    std::fs::write(entry.join("frame_0001.png"), b"truncated").unwrap();
    assert!(cache.load(&req).is_none());
}

#[test]
fn store_replaces_existing_entry() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ClipCache::new(dir.path());
    let req = request("harbour");
    cache.store(&req, &clip());

    let mut shorter = clip();
    shorter.frames.truncate(1);
    cache.store(&req, &shorter);
    assert_eq!(cache.load(&req).unwrap().frames.len(), 1);
}
