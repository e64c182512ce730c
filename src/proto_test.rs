use super::*;

// =============================================================================
// RequestFrame
// =============================================================================

#[test]
fn request_frame_serializes_with_expected_keys() {
    let frame = RequestFrame {
        request: "new_game".to_owned(),
        id: "7".to_owned(),
        payload: serde_json::json!({ "deposit": "1.0000 BET" }),
    };
    let value = serde_json::to_value(&frame).expect("serialize");
    assert_eq!(
        value,
        serde_json::json!({
            "request": "new_game",
            "id": "7",
            "payload": { "deposit": "1.0000 BET" }
        })
    );
}

// =============================================================================
// InboundFrame
// =============================================================================

#[test]
fn inbound_response_ok_parses() {
    let frame: InboundFrame = serde_json::from_str(
        r#"{"type":"response","id":"3","status":"ok","payload":{"balance":"5.0000 BET"}}"#,
    )
    .expect("parse");
    let InboundFrame::Response { id, status, payload } = frame else {
        panic!("expected response frame");
    };
    assert_eq!(id, "3");
    assert_eq!(status, ResponseStatus::Ok);
    assert_eq!(payload["balance"], "5.0000 BET");
}

#[test]
fn inbound_response_error_parses_error_payload() {
    let frame: InboundFrame = serde_json::from_str(
        r#"{"type":"response","id":"4","status":"error","payload":{"code":4002,"message":"token is expired"}}"#,
    )
    .expect("parse");
    let InboundFrame::Response { status, payload, .. } = frame else {
        panic!("expected response frame");
    };
    assert_eq!(status, ResponseStatus::Error);
    let err: ErrorPayload = serde_json::from_value(payload).expect("error payload");
    assert_eq!(err.code, 4002);
    assert_eq!(err.message, "token is expired");
}

#[test]
fn inbound_update_parses() {
    let frame: InboundFrame = serde_json::from_str(
        r#"{"type":"update","reason":"session_update","time":1700000000.5,"payload":[]}"#,
    )
    .expect("parse");
    let InboundFrame::Update { reason, time, payload } = frame else {
        panic!("expected update frame");
    };
    assert_eq!(reason, REASON_SESSION_UPDATE);
    assert!((time - 1_700_000_000.5).abs() < f64::EPSILON);
    assert_eq!(payload, serde_json::json!([]));
}

#[test]
fn inbound_update_missing_optional_fields_defaults() {
    let frame: InboundFrame =
        serde_json::from_str(r#"{"type":"update","reason":"maintenance"}"#).expect("parse");
    let InboundFrame::Update { time, payload, .. } = frame else {
        panic!("expected update frame");
    };
    assert!((time - 0.0).abs() < f64::EPSILON);
    assert_eq!(payload, serde_json::Value::Null);
}

#[test]
fn inbound_frame_rejects_unknown_type() {
    let result = serde_json::from_str::<InboundFrame>(r#"{"type":"gossip","id":"1"}"#);
    assert!(result.is_err());
}

#[test]
fn error_payload_defaults_missing_message() {
    let err: ErrorPayload = serde_json::from_str(r#"{"code":5000}"#).expect("parse");
    assert_eq!(err.code, 5000);
    assert_eq!(err.message, "");
}

// =============================================================================
// RestEnvelope
// =============================================================================

#[test]
fn rest_envelope_parses_success_shape() {
    let env: RestEnvelope =
        serde_json::from_str(r#"{"response":{"accessToken":"a","refreshToken":"r"},"error":null}"#)
            .expect("parse");
    assert!(env.error.is_none());
    assert_eq!(env.response.expect("response")["accessToken"], "a");
}

#[test]
fn rest_envelope_parses_error_shape() {
    let env: RestEnvelope =
        serde_json::from_str(r#"{"response":null,"error":{"code":401,"message":"expired"}}"#)
            .expect("parse");
    assert!(env.response.is_none());
    let err = env.error.expect("error");
    assert_eq!(err.code, 401);
    assert_eq!(err.message, "expired");
}
