use super::*;

// =============================================================================
// from_wire
// =============================================================================

#[test]
fn from_wire_maps_minus_one_to_connection_closed() {
    let err = Error::from_wire(-1, "gone".to_owned());
    assert!(matches!(err, Error::ConnectionClosed(_)));
}

#[test]
fn from_wire_maps_auth_check_to_token_expired() {
    let err = Error::from_wire(4002, "token is expired".to_owned());
    assert!(matches!(err, Error::TokenExpired(_)));
}

#[test]
fn from_wire_maps_other_codes_to_protocol() {
    let err = Error::from_wire(4000, "bad request".to_owned());
    assert!(matches!(err, Error::Protocol { code: 4000, .. }));

    let err = Error::from_wire(5000, "boom".to_owned());
    assert!(matches!(err, Error::Protocol { code: 5000, .. }));
}

#[test]
fn error_code_wire_values() {
    assert_eq!(ErrorCode::BadRequest.as_i64(), 4000);
    assert_eq!(ErrorCode::RequestParse.as_i64(), 4001);
    assert_eq!(ErrorCode::AuthCheck.as_i64(), 4002);
    assert_eq!(ErrorCode::Unauthorized.as_i64(), 4003);
    assert_eq!(ErrorCode::ContentNotFound.as_i64(), 4004);
    assert_eq!(ErrorCode::Internal.as_i64(), 5000);
}

// =============================================================================
// from_http
// =============================================================================

#[test]
fn from_http_maps_401_to_token_expired() {
    let err = Error::from_http(401, "expired".to_owned());
    assert!(matches!(err, Error::HttpTokenExpired(_)));
}

#[test]
fn from_http_maps_4xx_to_client_error() {
    let err = Error::from_http(404, "not found".to_owned());
    assert!(matches!(err, Error::HttpClient { code: 404, .. }));
}

#[test]
fn from_http_maps_5xx_to_server_error() {
    let err = Error::from_http(503, "unavailable".to_owned());
    assert!(matches!(err, Error::HttpServer { code: 503, .. }));
}

// =============================================================================
// authoritative auth failures
// =============================================================================

#[test]
fn token_expired_and_client_errors_are_authoritative() {
    assert!(Error::HttpTokenExpired("x".to_owned()).is_authoritative_auth_failure());
    assert!(
        Error::HttpClient { code: 403, message: "x".to_owned() }.is_authoritative_auth_failure()
    );
}

#[test]
fn transient_failures_are_not_authoritative() {
    assert!(!Error::HttpServer { code: 502, message: "x".to_owned() }
        .is_authoritative_auth_failure());
    assert!(!Error::closed().is_authoritative_auth_failure());
    assert!(!Error::TokenExpired("x".to_owned()).is_authoritative_auth_failure());
}

// =============================================================================
// display
// =============================================================================

#[test]
fn display_includes_code_and_message() {
    let err = Error::Protocol { code: 4003, message: "unauthorized".to_owned() };
    assert_eq!(err.to_string(), "server error 4003: unauthorized");
}

#[test]
fn closed_constructor_message() {
    assert_eq!(Error::closed().to_string(), "connection closed: websocket was closed");
}
