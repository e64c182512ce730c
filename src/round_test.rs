use super::*;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use crate::api::{Api, ConnectParams};
use crate::models::UpdateKind::GameFinished;
use crate::proto::RequestFrame;

// =============================================================================
// money strings
// =============================================================================

#[test]
fn parse_bet_strips_suffix() {
    assert!((parse_bet("1.5000 BET").expect("parse") - 1.5).abs() < f64::EPSILON);
}

#[test]
fn parse_bet_tolerates_missing_suffix() {
    assert!((parse_bet("0.5").expect("parse") - 0.5).abs() < f64::EPSILON);
}

#[test]
fn parse_bet_rejects_non_numeric() {
    let error = parse_bet("all-in BET").expect_err("invalid");
    assert!(matches!(error, Error::InvalidBet(_)), "got {error:?}");
}

#[test]
fn format_bet_pads_to_four_decimals() {
    assert_eq!(format_bet(1.5), "1.5000 BET");
    assert_eq!(format_bet(2.0), "2.0000 BET");
}

#[test]
fn format_bet_truncates_excess_decimals() {
    assert_eq!(format_bet(0.123_456), "0.1234 BET");
}

#[test]
fn format_bet_handles_negative_amounts() {
    assert_eq!(format_bet(-0.5), "-0.5000 BET");
}

// =============================================================================
// game flow against a protocol stub
// =============================================================================

/// Serves the game methods; every `fetch_session_updates` grows the session
/// log by one finishing update and pushes the whole log.
async fn serve_game(listener: TcpListener, account: Value) {
    let (stream, _) = listener.accept().await.expect("accept");
    let mut ws = tokio_tungstenite::accept_async(stream).await.expect("handshake");
    let mut log: Vec<Value> = Vec::new();

    while let Some(Ok(msg)) = ws.next().await {
        let Message::Text(text) = msg else { continue };
        let frame: RequestFrame = serde_json::from_str(&text).expect("request frame");
        let payload = match frame.request.as_str() {
            "account_info" => account.clone(),
            "new_game" => json!({
                "id": "s-1",
                "player": "alice",
                "casinoID": "c-1",
                "gameID": "g-1",
                "state": 0,
                "deposit": "1.0000 BET",
            }),
            "game_action" => json!({}),
            "fetch_session_updates" => json!([]),
            other => panic!("unexpected request {other}"),
        };
        let response = json!({
            "type": "response",
            "id": frame.id,
            "status": "ok",
            "payload": payload,
        });
        let text = serde_json::to_string(&response).expect("serialize");
        ws.send(Message::Text(text.into())).await.expect("ws write");

        if frame.request == "fetch_session_updates" {
            log.push(json!({
                "sessionId": "s-1",
                "updateType": 4,
                "timestamp": format!("t{}", log.len() + 1),
                "data": { "profit": "0.5000 BET" }
            }));
            let push = json!({
                "type": "update",
                "reason": "session_update",
                "time": 1_700_000_000.0,
                "payload": log,
            });
            let text = serde_json::to_string(&push).expect("serialize");
            ws.send(Message::Text(text.into())).await.expect("ws write");
        }
    }
}

async fn service_over_stub(account: Value) -> GameService {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let host = listener.local_addr().expect("addr").to_string();
    tokio::spawn(serve_game(listener, account));
    let params = ConnectParams { secure: false, auto_refresh: false, ..ConnectParams::default() };
    let api = Arc::new(Api::connect(&host, params).await.expect("connect"));
    let game = CasinoGame {
        game_id: "g-1".to_owned(),
        paused: false,
        params: vec![GameParams { param_type: 0, value: "36".to_owned() }],
    };
    GameService::new(api, &game, "c-1")
}

fn plain_account() -> Value {
    json!({ "accountName": "alice", "balance": "5.0000 BET" })
}

#[tokio::test]
async fn balance_adds_this_casinos_bonus() {
    let service = service_over_stub(json!({
        "accountName": "alice",
        "balance": "5.0000 BET",
        "bonusBalances": { "c-1": { "balance": "1.2500 BET" } }
    }))
    .await;
    assert_eq!(service.balance().await.expect("balance"), "6.2500 BET");
}

#[tokio::test]
async fn balance_ignores_other_casinos_bonus() {
    let service = service_over_stub(json!({
        "accountName": "alice",
        "balance": "5.0000 BET",
        "bonusBalances": { "c-9": { "balance": "1.2500 BET" } }
    }))
    .await;
    assert_eq!(service.balance().await.expect("balance"), "5.0000 BET");
}

#[tokio::test]
async fn account_name_comes_from_account_info() {
    let service = service_over_stub(plain_account()).await;
    assert_eq!(service.account_name().await.expect("name"), "alice");
}

#[tokio::test]
async fn action_without_session_is_rejected_locally() {
    let service = service_over_stub(plain_account()).await;
    let error = service.action(0, &[1], "", &[GameFinished]).await.expect_err("no session");
    assert!(matches!(error, Error::NoActiveSession), "got {error:?}");
}

#[tokio::test]
async fn start_game_resolves_the_finishing_update() {
    let service = service_over_stub(plain_account()).await;

    let update = service
        .start_game("1.0000 BET", 0, &[2], &[GameFinished])
        .await
        .expect("start_game");
    assert_eq!(update.timestamp, "t1");
    assert_eq!(update.data["profit"], "0.5000 BET");
    assert_eq!(service.session().expect("session").id, "s-1");
}

#[tokio::test]
async fn action_consumes_the_next_update_not_the_first() {
    let service = service_over_stub(plain_account()).await;

    let first = service
        .start_game("1.0000 BET", 0, &[2], &[GameFinished])
        .await
        .expect("start_game");
    assert_eq!(first.timestamp, "t1");

    // The replayed log still contains t1; the shared cursor skips it.
    let second = service.action(0, &[1], "", &[GameFinished]).await.expect("action");
    assert_eq!(second.timestamp, "t2");
}
