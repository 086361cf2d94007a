use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        LoomError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        LoomError::capability("gif", "x")
            .to_string()
            .contains("capability error (gif):")
    );
    assert!(LoomError::encode("x").to_string().contains("encode error:"));
    assert!(
        LoomError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = LoomError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn context_wrapping_keeps_category_and_metadata() {
    let err = LoomError::encode("pipe closed").in_op(
        "export.finalize",
        &[("format", "video".to_owned()), ("frame", "7".to_owned())],
    );
    let msg = err.to_string();
    assert!(msg.contains("export.finalize"));
    assert!(msg.contains("format=video, frame=7"));
    assert!(msg.contains("pipe closed"));
    assert_eq!(err.category(), ErrorCategory::Encode);
    assert!(err.is_retryable());
}

#[test]
fn validation_and_capability_are_not_retryable() {
    assert!(!LoomError::validation("x").is_retryable());
    assert!(!LoomError::capability("video", "no ffmpeg").is_retryable());
    assert_eq!(
        LoomError::capability("video", "no ffmpeg").category(),
        ErrorCategory::Capability
    );
}
