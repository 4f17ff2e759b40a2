use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        RecapError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        RecapError::missing_data("x")
            .to_string()
            .contains("missing data:")
    );
    assert!(
        RecapError::malformed_event("x")
            .to_string()
            .contains("malformed event:")
    );
    assert!(RecapError::render("x").to_string().contains("render error:"));
    assert!(RecapError::encode("x").to_string().contains("encode error:"));
    assert!(
        RecapError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = RecapError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn per_replay_failures_are_batch_recoverable() {
    assert!(RecapError::missing_data("no frames").is_batch_recoverable());
    assert!(RecapError::render("boom").is_batch_recoverable());
    assert!(RecapError::encode("ffmpeg").is_batch_recoverable());
    assert!(!RecapError::validation("bad fps").is_batch_recoverable());
}
