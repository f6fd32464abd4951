use super::*;

#[test]
fn happy_path_visits_every_stage_in_order() {
    let mut t = StageTracker::new();
    let mut stage = t.current();
    while let Some(next) = stage.next() {
        t.advance(next).unwrap();
        stage = next;
    }
    assert_eq!(t.current(), PipelineStage::Done);
    let visited: Vec<_> = t.history().iter().map(|r| r.stage).collect();
    assert_eq!(
        visited,
        vec![
            PipelineStage::Validating,
            PipelineStage::Generating,
            PipelineStage::Assembling,
            PipelineStage::PostProcessing,
            PipelineStage::Exporting,
        ]
    );
}

#[test]
fn skipping_a_stage_is_illegal() {
    let mut t = StageTracker::new();
    assert_eq!(
        t.advance(PipelineStage::Assembling),
        Err(IllegalTransition {
            from: PipelineStage::Validating,
            to: PipelineStage::Assembling,
        })
    );
    assert_eq!(t.current(), PipelineStage::Validating);
}

#[test]
fn failed_is_reachable_from_any_active_stage() {
    for start in [
        PipelineStage::Validating,
        PipelineStage::Generating,
        PipelineStage::Assembling,
        PipelineStage::PostProcessing,
        PipelineStage::Exporting,
    ] {
        let mut t = StageTracker::starting_at(start);
        assert_eq!(t.fail(), Some(start));
        assert_eq!(t.current(), PipelineStage::Failed);
    }
}

#[test]
fn terminal_stages_are_final() {
    let mut t = StageTracker::starting_at(PipelineStage::Done);
    assert!(t.advance(PipelineStage::Failed).is_err());
    assert_eq!(t.fail(), None);

    let mut t = StageTracker::starting_at(PipelineStage::Failed);
    assert!(t.advance(PipelineStage::Validating).is_err());
}

#[test]
fn stages_serialize_snake_case() {
    assert_eq!(
        serde_json::to_string(&PipelineStage::PostProcessing).unwrap(),
        "\"post_processing\""
    );
    assert_eq!(PipelineStage::PostProcessing.to_string(), "post_processing");
}
