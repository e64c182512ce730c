use super::*;

// =============================================================================
// UpdateKind
// =============================================================================

#[test]
fn update_kind_numeric_mapping_matches_wire_enum() {
    assert_eq!(UpdateKind::SessionCreated.as_u32(), 0);
    assert_eq!(UpdateKind::GameStarted.as_u32(), 1);
    assert_eq!(UpdateKind::ActionRequested.as_u32(), 2);
    assert_eq!(UpdateKind::GameMessage.as_u32(), 3);
    assert_eq!(UpdateKind::GameFinished.as_u32(), 4);
    assert_eq!(UpdateKind::GameFailed.as_u32(), 5);
}

#[test]
fn update_kind_round_trips_from_wire_values() {
    for raw in 0..=5 {
        let kind = UpdateKind::from_u32(raw).expect("kind");
        assert_eq!(kind.as_u32(), raw);
    }
}

#[test]
fn update_kind_rejects_out_of_range_value() {
    assert!(UpdateKind::from_u32(99).is_none());
    assert!(serde_json::from_str::<UpdateKind>("99").is_err());
}

#[test]
fn update_kind_serializes_as_integer() {
    assert_eq!(serde_json::to_string(&UpdateKind::GameFinished).expect("serialize"), "4");
}

// =============================================================================
// SessionUpdate
// =============================================================================

#[test]
fn session_update_parses_wire_shape() {
    let update: SessionUpdate = serde_json::from_str(
        r#"{"sessionId":"s-1","updateType":3,"timestamp":"2026-01-02T03:04:05Z","data":{"msg":"hi"}}"#,
    )
    .expect("parse");
    assert_eq!(update.session_id, "s-1");
    assert_eq!(update.update_kind, UpdateKind::GameMessage);
    assert_eq!(update.timestamp, "2026-01-02T03:04:05Z");
    assert_eq!(update.data["msg"], "hi");
}

#[test]
fn session_update_defaults_missing_data() {
    let update: SessionUpdate = serde_json::from_str(
        r#"{"sessionId":"s-1","updateType":4,"timestamp":"2026-01-02T03:04:05Z"}"#,
    )
    .expect("parse");
    assert_eq!(update.data, serde_json::Value::Null);
}

// =============================================================================
// TokenPair
// =============================================================================

#[test]
fn token_pair_uses_camel_case_keys() {
    let pair = TokenPair { access_token: "a".to_owned(), refresh_token: "r".to_owned() };
    let value = serde_json::to_value(&pair).expect("serialize");
    assert_eq!(value, serde_json::json!({ "accessToken": "a", "refreshToken": "r" }));
}

// =============================================================================
// GameSession
// =============================================================================

#[test]
fn game_session_parses_wire_shape() {
    let session: GameSession = serde_json::from_str(
        r#"{"id":"s-9","player":"alice","casinoID":"c-1","gameID":"g-1","blockchainSesID":"b-1","state":1,"lastUpdate":1700000000,"deposit":"1.0000 BET","playerWinAmount":"2.0000 BET"}"#,
    )
    .expect("parse");
    assert_eq!(session.casino_id, "c-1");
    assert_eq!(session.game_id, "g-1");
    assert_eq!(session.state, SessionState::GameStartedInBc);
    assert_eq!(session.player_win_amount.as_deref(), Some("2.0000 BET"));
}

#[test]
fn game_session_rejects_unknown_state() {
    let result = serde_json::from_str::<GameSession>(
        r#"{"id":"s","player":"p","casinoID":"c","gameID":"g","state":42,"deposit":"0"}"#,
    );
    assert!(result.is_err());
}

// =============================================================================
// AccountInfo
// =============================================================================

#[test]
fn account_info_parses_with_bonus_balances() {
    let info: AccountInfo = serde_json::from_str(
        r#"{"accountName":"alice","balance":"5.0000 BET","bonusBalances":{"c-1":{"balance":"1.0000 BET"}}}"#,
    )
    .expect("parse");
    assert_eq!(info.account_name, "alice");
    let bonuses = info.bonus_balances.expect("bonuses");
    assert_eq!(bonuses["c-1"].balance.as_deref(), Some("1.0000 BET"));
}

#[test]
fn account_info_defaults_optional_fields() {
    let info: AccountInfo =
        serde_json::from_str(r#"{"accountName":"bob","balance":"0.0000 BET"}"#).expect("parse");
    assert!(info.linked_casinos.is_empty());
    assert!(info.bonus_balances.is_none());
    assert_eq!(info.email, "");
}

// =============================================================================
// SessionFilter
// =============================================================================

#[test]
fn session_filter_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&SessionFilter::Wins).expect("serialize"), "\"wins\"");
    assert_eq!(SessionFilter::Losts.as_str(), "losts");
}
