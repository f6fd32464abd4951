use super::*;

fn target(width: u32, height: u32, aspect: &str) -> TargetSpec {
    TargetSpec {
        width,
        height,
        aspect: aspect.parse().unwrap(),
        ..TargetSpec::default()
    }
}

#[test]
fn default_target_is_portrait_hd_letterbox() {
    let t = TargetSpec::default();
    assert_eq!((t.width, t.height), (1080, 1920));
    assert_eq!(t.aspect, Aspect { w: 9, h: 16 });
    assert_eq!(t.fit, FitPolicy::Letterbox);
    assert!(t.validate().is_ok());
}

#[test]
fn aspect_parses_and_round_trips_through_serde() {
    let a: Aspect = serde_json::from_str("\"16:9\"").unwrap();
    assert_eq!(a, Aspect { w: 16, h: 9 });
    assert_eq!(serde_json::to_string(&a).unwrap(), "\"16:9\"");
    assert!("16x9".parse::<Aspect>().is_err());
    assert!("0:1".parse::<Aspect>().is_err());
    assert!(serde_json::from_str::<Aspect>("\"wide\"").is_err());
}

#[test]
fn unsupported_aspect_is_rejected() {
    let err = target(2100, 900, "21:9").validate().unwrap_err();
    match err {
        ExportError::UnsupportedAspect { aspect, supported } => {
            assert_eq!(aspect, "21:9");
            assert!(supported.contains("9:16"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn size_must_match_declared_aspect() {
    assert!(target(1920, 1080, "16:9").validate().is_ok());
    assert!(target(1080, 1080, "1:1").validate().is_ok());
    assert!(matches!(
        target(1080, 1920, "16:9").validate(),
        Err(ExportError::InvalidTarget(_))
    ));
}

#[test]
fn odd_or_zero_sizes_are_invalid() {
    assert!(matches!(
        target(0, 0, "1:1").validate(),
        Err(ExportError::InvalidTarget(_))
    ));
    assert!(matches!(
        target(9, 16, "9:16").validate(),
        Err(ExportError::InvalidTarget(_))
    ));
}

#[test]
fn max_duration_and_threads_are_checked() {
    let mut t = TargetSpec {
        max_duration_secs: Some(0.0),
        ..TargetSpec::default()
    };
    assert!(t.validate().is_err());
    t.max_duration_secs = Some(60.0);
    t.threads = Some(0);
    assert!(t.validate().is_err());
}

#[test]
fn partial_json_keeps_defaults() {
    let t: TargetSpec =
        serde_json::from_str(r#"{ "fit": "crop", "format": "y4m", "width": 720, "height": 1280 }"#)
            .unwrap();
    assert_eq!(t.fit, FitPolicy::Crop);
    assert_eq!(t.format, OutputFormat::Y4m);
    assert_eq!(t.aspect, Aspect::PORTRAIT);
    assert!(t.validate().is_ok());
}

#[test]
fn format_from_extension() {
    assert_eq!(OutputFormat::from_extension("MP4"), Some(OutputFormat::Mp4));
    assert_eq!(OutputFormat::from_extension("y4m"), Some(OutputFormat::Y4m));
    assert_eq!(OutputFormat::from_extension("gif"), None);
}
