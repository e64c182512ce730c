//! Duplex RPC channel — request/response correlation over one websocket.
//!
//! ARCHITECTURE
//! ============
//! A single handler task owns the socket. The public [`RpcChannel`] handle
//! submits calls over an mpsc queue and awaits a oneshot reply; the handler
//! loop assigns correlation ids, writes outbound frames, and routes inbound
//! frames back to their pending callers. Uncorrelated `update` pushes are
//! forwarded to the [`EventBus`].
//!
//! Pending replies live in a `BTreeMap` keyed by the numeric correlation id,
//! so close-time draining rejects them in registration order. There is no
//! per-call timeout: a call with no matching response and no close event
//! stays pending indefinitely.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::bus::{Event, EventBus};
use crate::error::Error;
use crate::models::SessionUpdate;
use crate::proto::{ErrorPayload, InboundFrame, REASON_SESSION_UPDATE, RequestFrame, ResponseStatus};

/// Client-side websocket stream type.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Invoked exactly once when the socket closes, after every pending request
/// has been rejected.
pub type CloseHandler = Box<dyn FnOnce() + Send>;

type PendingTx = oneshot::Sender<Result<Value, Error>>;

struct RpcCall {
    method: String,
    payload: Value,
    reply: PendingTx,
}

enum Command {
    Call(RpcCall),
    Shutdown,
}

/// Handle to the connection's RPC handler task.
pub struct RpcChannel {
    cmd_tx: mpsc::Sender<Command>,
    open: Arc<AtomicBool>,
    _handler: JoinHandle<()>,
}

impl RpcChannel {
    /// Spawn the handler task over an established socket.
    #[must_use]
    pub fn spawn(ws: WsStream, bus: Arc<EventBus>, on_close: Option<CloseHandler>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let open = Arc::new(AtomicBool::new(true));
        let handler = tokio::spawn(channel_loop(ws, cmd_rx, Arc::clone(&open), bus, on_close));
        Self { cmd_tx, open, _handler: handler }
    }

    /// Whether the socket is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Send an RPC call and await its correlated response payload.
    ///
    /// # Errors
    ///
    /// Fails immediately with [`Error::ConnectionClosed`] when the socket is
    /// not open (nothing is written in that case); otherwise settles with the
    /// server's response, or with [`Error::ConnectionClosed`] if the socket
    /// closes while the call is pending.
    pub async fn send(&self, method: &str, payload: Value) -> Result<Value, Error> {
        if !self.is_open() {
            return Err(Error::not_open());
        }
        let (reply, rx) = oneshot::channel();
        let call = RpcCall { method: method.to_owned(), payload, reply };
        self.cmd_tx
            .send(Command::Call(call))
            .await
            .map_err(|_| Error::not_open())?;
        rx.await.map_err(|_| Error::closed())?
    }

    /// Close the socket. Pending requests are rejected by the handler task.
    pub async fn close(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
    }
}

async fn channel_loop(
    ws: WsStream,
    mut cmd_rx: mpsc::Receiver<Command>,
    open: Arc<AtomicBool>,
    bus: Arc<EventBus>,
    on_close: Option<CloseHandler>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: BTreeMap<u64, PendingTx> = BTreeMap::new();
    let mut next_id: u64 = 0;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    None | Some(Command::Shutdown) => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    Some(Command::Call(call)) => {
                        next_id += 1;
                        let frame = RequestFrame {
                            request: call.method,
                            id: next_id.to_string(),
                            payload: call.payload,
                        };
                        let text = match serde_json::to_string(&frame) {
                            Ok(text) => text,
                            Err(error) => {
                                let _ = call.reply.send(Err(Error::Json(error)));
                                continue;
                            }
                        };
                        debug!(id = next_id, method = %frame.request, "sending rpc request");
                        pending.insert(next_id, call.reply);
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => dispatch_inbound(&text, &mut pending, &bus),
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    open.store(false, Ordering::SeqCst);

    // Reject calls that raced the close through the queue, then the pending
    // table in registration (id) order. Each reply settles at most once by
    // construction of the oneshot.
    cmd_rx.close();
    while let Ok(cmd) = cmd_rx.try_recv() {
        if let Command::Call(call) = cmd {
            let _ = call.reply.send(Err(Error::closed()));
        }
    }
    let drained = pending.len();
    for (_, reply) in std::mem::take(&mut pending) {
        let _ = reply.send(Err(Error::closed()));
    }
    debug!(drained, "websocket closed, pending requests rejected");

    bus.emit(&Event::Closed);
    if let Some(cb) = on_close {
        cb();
    }
}

fn dispatch_inbound(text: &str, pending: &mut BTreeMap<u64, PendingTx>, bus: &EventBus) {
    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame,
        Err(error) => {
            debug!(%error, "dropping unparseable inbound frame");
            return;
        }
    };

    match frame {
        InboundFrame::Response { id, status, payload } => {
            let Ok(numeric_id) = id.parse::<u64>() else {
                warn!(%id, "dropping response with malformed id");
                return;
            };
            // A response with no pending request is a protocol violation by
            // the server; logged and dropped, never fatal.
            let Some(reply) = pending.remove(&numeric_id) else {
                warn!(%id, "dropping response with no pending request");
                return;
            };
            let outcome = match status {
                ResponseStatus::Ok => Ok(payload),
                ResponseStatus::Error => {
                    Err(serde_json::from_value::<ErrorPayload>(payload).map_or_else(
                        |_| Error::Protocol {
                            code: 0,
                            message: "malformed error payload".to_owned(),
                        },
                        |err| Error::from_wire(err.code, err.message),
                    ))
                }
            };
            let _ = reply.send(outcome);
        }
        InboundFrame::Update { reason, payload, .. } => {
            if reason == REASON_SESSION_UPDATE {
                match serde_json::from_value::<Vec<SessionUpdate>>(payload) {
                    Ok(batch) => bus.emit(&Event::SessionUpdates(batch)),
                    Err(error) => warn!(%error, "dropping malformed session_update payload"),
                }
            } else {
                debug!(%reason, "ignoring update frame");
            }
        }
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
