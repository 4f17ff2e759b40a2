use super::*;

#[test]
fn defaults_match_standard_recap_settings() {
    let cfg = RecapConfig::default();
    assert_eq!((cfg.canvas.width, cfg.canvas.height), (1280, 720));
    assert_eq!(cfg.schedule.hold_frames, 45);
    assert_eq!(cfg.schedule.intro_frames(), 90);
    assert_eq!(cfg.schedule.outro_frames(), 120);
    assert_eq!(cfg.encode.crf, 23);
    cfg.validate().unwrap();
}

#[test]
fn partial_file_overrides_only_named_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    std::fs::write(
        &path,
        r#"{"canvas": {"width": 640, "height": 360}, "schedule": {"hold_frames": 30}}"#,
    )
    .unwrap();
    let cfg = RecapConfig::from_path(&path).unwrap();
    assert_eq!(cfg.canvas.width, 640);
    assert_eq!(cfg.schedule.hold_frames, 30);
    assert_eq!(cfg.schedule.intro_secs, 3);
    assert_eq!(cfg.encode, EncodeOpts::default());
    assert_eq!(cfg.palette, Palette::default());
}

#[test]
fn invalid_values_are_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    std::fs::write(&path, r#"{"schedule": {"hold_frames": 0}}"#).unwrap();
    assert!(matches!(
        RecapConfig::from_path(&path),
        Err(RecapError::Validation(_))
    ));

    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(
        RecapConfig::from_path(&path),
        Err(RecapError::Serde(_))
    ));

    assert!(matches!(
        RecapConfig::from_path(dir.path().join("missing.json")),
        Err(RecapError::Validation(_))
    ));
}
