use super::*;
use crate::assemble::TimelineClip;
use crate::foundation::core::Fps;
use std::sync::Arc;

fn timeline(clips: &[(usize, u32)]) -> AssembledTimeline {
    let fps = Fps::whole(10).unwrap();
    let mut start = 0u64;
    let clips = clips
        .iter()
        .enumerate()
        .map(|(i, &(frames, size))| {
            let clip = TimelineClip {
                scene_index: i,
                frames: (0..frames)
                    .map(|_| Arc::new(FrameRGBA::solid(size, size, [i as u8 * 100, 0, 0])))
                    .collect(),
                target_frame_rate: fps,
                start_offset_seconds: fps.frames_to_secs(start),
                start_frame: start,
            };
            start += frames as u64;
            clip
        })
        .collect::<Vec<_>>();
    AssembledTimeline {
        fps,
        total_duration_seconds: fps.frames_to_secs(start),
        clips,
    }
}

#[test]
fn wipe_dir_parses_aliases() {
    let spec = TransitionSpec {
        kind: "wipe".to_string(),
        duration_secs: 1.0,
        params: serde_json::json!({ "dir": "ttb", "soft_edge": 0.1 }),
    };
    assert_eq!(
        parse_transition(&spec).unwrap(),
        TransitionKind::Wipe {
            dir: WipeDir::TopToBottom,
            soft_edge: 0.1
        }
    );
}

#[test]
fn wipe_soft_edge_is_clamped() {
    let spec = TransitionSpec {
        kind: "wipe".to_string(),
        duration_secs: 1.0,
        params: serde_json::json!({ "soft_edge": -5.0 }),
    };
    assert_eq!(
        parse_transition(&spec).unwrap(),
        TransitionKind::Wipe {
            dir: WipeDir::LeftToRight,
            soft_edge: 0.0
        }
    );
}

#[test]
fn default_is_half_second_crossfade() {
    let spec = TransitionSpec::default();
    assert_eq!(parse_transition(&spec).unwrap(), TransitionKind::Crossfade);
    assert_eq!(spec.duration_secs, 0.5);
    assert_eq!(parse_transition(&TransitionSpec::cut()).unwrap(), TransitionKind::Cut);
}

#[test]
fn unknown_kind_and_negative_duration_are_rejected() {
    let mut spec = TransitionSpec {
        kind: "spin".to_string(),
        ..TransitionSpec::default()
    };
    assert!(parse_transition(&spec).is_err());
    spec.kind = "crossfade".to_string();
    spec.duration_secs = -1.0;
    assert!(parse_transition(&spec).is_err());
}

#[test]
fn windows_sit_at_the_end_of_outgoing_clips() {
    let tl = timeline(&[(20, 2), (20, 2), (3, 2)]);
    let mut issues = Vec::new();
    let plan = plan_transitions(&tl, &TransitionKind::Crossfade, 0.5, &mut issues);

    assert!(issues.is_empty());
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].window_start, 15);
    assert_eq!(plan[0].frames, 5);
    // Limited by the 3-frame incoming clip.
    assert_eq!(plan[1].window_start, 37);
    assert_eq!(plan[1].frames, 3);
    assert!(plan[0].covers(19) && !plan[0].covers(20));
    let p = plan[0].progress(15);
    assert!(p > 0.0 && p < 1.0);
}

#[test]
fn cut_plans_nothing() {
    let tl = timeline(&[(20, 2), (20, 2)]);
    let mut issues = Vec::new();
    assert!(plan_transitions(&tl, &TransitionKind::Cut, 0.5, &mut issues).is_empty());
}

#[test]
fn size_mismatch_falls_back_to_cut_with_issue() {
    let tl = timeline(&[(20, 2), (20, 4)]);
    let mut issues = Vec::new();
    let plan = plan_transitions(&tl, &TransitionKind::Crossfade, 0.5, &mut issues);
    assert!(plan.is_empty());
    assert!(matches!(
        issues.as_slice(),
        [PostProcessError::Transition { scene_index: 0, .. }]
    ));
}

#[test]
fn crossfade_blend_mixes_both_frames() {
    let a = FrameRGBA::solid(2, 2, [0, 0, 0]);
    let b = FrameRGBA::solid(2, 2, [200, 200, 200]);
    let mid = blend_frames(&a, &b, &TransitionKind::Crossfade, 0.5).unwrap();
    let px = mid.pixel(1, 1);
    assert!(px[0] > 90 && px[0] < 110, "{px:?}");
    assert_eq!(px[3], 255);
    assert!(blend_frames(&a, &FrameRGBA::solid(1, 1, [0, 0, 0]), &TransitionKind::Crossfade, 0.5).is_err());
}
