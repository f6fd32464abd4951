use super::*;

fn partial() -> PipelineResult {
    PipelineResult {
        status: RunStatus::PartialFailure,
        output_path: Some(PathBuf::from("out/reel.mp4")),
        per_scene_status: vec![
            SceneReport {
                scene_index: 0,
                status: SceneStatus::Retried { attempts: 2 },
            },
            SceneReport {
                scene_index: 1,
                status: SceneStatus::Failed {
                    reason: "rejected by model: nsfw".to_string(),
                    attempts: 1,
                    placeholder: true,
                },
            },
        ],
        placeholders: vec![1],
        warnings: vec!["overlay dropped".to_string()],
        stages: Vec::new(),
        failed_stage: None,
        error: None,
        duration_secs: 3.0,
        export: None,
    }
}

#[test]
fn exit_codes() {
    assert_eq!(RunStatus::Success.exit_code(), 0);
    assert_eq!(RunStatus::PartialFailure.exit_code(), 2);
    assert_eq!(RunStatus::Failure.exit_code(), 1);
}

#[test]
fn json_report_is_flat_and_snake_case() {
    let v: serde_json::Value = serde_json::from_str(&partial().to_json_pretty().unwrap()).unwrap();
    assert_eq!(v["status"], "partial_failure");
    assert_eq!(v["output_path"], "out/reel.mp4");
    assert_eq!(v["placeholders"], serde_json::json!([1]));
    assert_eq!(v["per_scene_status"][0]["state"], "retried");
    assert_eq!(v["per_scene_status"][0]["attempts"], 2);
    assert_eq!(v["per_scene_status"][1]["scene_index"], 1);
    assert_eq!(v["per_scene_status"][1]["placeholder"], true);
    assert!(v["failed_stage"].is_null());
}

#[test]
fn summary_names_failed_scenes_and_reasons() {
    let s = partial().summary();
    assert!(s.contains("status: partial failure"));
    assert!(s.contains("scene 0: ok after 2 attempts"));
    assert!(s.contains("scene 1: FAILED rejected by model: nsfw [placeholder]"));
    assert!(s.contains("warning: overlay dropped"));
}

#[test]
fn failure_summary_includes_stage() {
    let r = PipelineResult {
        status: RunStatus::Failure,
        output_path: None,
        failed_stage: Some(PipelineStage::Exporting),
        error: Some("export cancelled: run timed out".to_string()),
        ..partial()
    };
    assert!(!r.has_output());
    assert_eq!(r.failed_scenes(), vec![1]);
    assert!(r.summary().contains("failed while exporting: export cancelled: run timed out"));
}

#[test]
fn success_state_depends_on_attempts() {
    assert_eq!(SceneStatus::succeeded(1, false), SceneStatus::Ok { cached: false });
    assert_eq!(SceneStatus::succeeded(0, true), SceneStatus::Ok { cached: true });
    assert_eq!(SceneStatus::succeeded(3, false), SceneStatus::Retried { attempts: 3 });
    assert!(SceneStatus::Retried { attempts: 3 }.is_generated());
    assert!(!SceneStatus::Pending.is_generated());

    let v = serde_json::to_value(SceneReport {
        scene_index: 4,
        status: SceneStatus::Ok { cached: true },
    })
    .unwrap();
    assert_eq!(v, serde_json::json!({"scene_index": 4, "state": "ok", "cached": true}));
}
