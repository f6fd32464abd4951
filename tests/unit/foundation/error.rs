use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn stage_errors_convert_transparently() {
    let err: ReelError = crate::assemble::AssemblyError::EmptyClip { scene_index: 3 }.into();
    assert!(err.to_string().contains("scene 3"));
}

#[test]
fn json_errors_map_to_serde_variant() {
    let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: ReelError = parse.into();
    assert!(matches!(err, ReelError::Serde(_)));
}
