use super::*;

#[test]
fn template_is_a_valid_sixty_second_script() {
    let script = create_script_template();
    assert_eq!(script.len(), 4);
    assert!((script.total_duration_secs() - 60.0).abs() < 1e-9);

    let json = script.to_json_pretty().unwrap();
    let reparsed = parse_script(&json, &ValidationConfig::default()).unwrap();
    assert_eq!(reparsed, script);
}

#[test]
fn save_then_load_preserves_script() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("script.json");
    let script = create_script_template();
    save_script(&script, &path).unwrap();
    let loaded = load_script(&path, &ValidationConfig::default()).unwrap();
    assert_eq!(loaded.title(), script.title());
    assert_eq!(loaded.call_to_action(), Some("Follow for the next chapter"));
}

#[test]
fn load_missing_file_is_io_error() {
    let err = load_script("/definitely/not/here.json", &ValidationConfig::default()).unwrap_err();
    assert!(matches!(err, ScriptError::Io(_)));
}

#[test]
fn unknown_preset_falls_back_to_generic_prompt() {
    let p = prompt_preset("boston_tea_party");
    assert_eq!(p.description, "Custom historical event");
    assert!(p.prompt.contains("boston tea party"));
    assert_ne!(prompt_preset("suffrage_movement").prompt, p.prompt);
}
