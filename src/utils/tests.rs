use super::error::SessionError;
use super::logging;
use crate::protocol::ProtocolError;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("WARNING"), tracing::Level::WARN);
    assert_eq!(logging::parse_level("trace"), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("verbose"), tracing::Level::INFO);
}

#[test]
fn payload_errors_map_to_payload_decode() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: SessionError = ProtocolError::Payload(json_err).into();
    assert!(matches!(err, SessionError::PayloadDecode(_)));
    assert!(err.is_decode_error());

    let err: SessionError = ProtocolError::MissingNewline.into();
    assert!(matches!(err, SessionError::ProtocolDecode(_)));
}

#[test]
fn timeout_error_names_the_request() {
    let err = SessionError::RequestTimeout {
        topic: "orders.created".into(),
        request_id: "abc".into(),
        timeout_ms: 50,
    };
    let text = err.to_string();
    assert!(text.contains("orders.created"));
    assert!(text.contains("50 ms"));
}
