//! High-level client: connection wiring plus the typed RPC surface.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::auth::{AuthRpc, CredentialManager};
use crate::bus::{EventBus, Topic};
use crate::channel::{CloseHandler, RpcChannel};
use crate::error::Error;
use crate::models::{
    AccountInfo, Casino, CasinoGame, Game, GameSession, SessionFilter, SessionUpdate,
};
use crate::store::{MemoryStore, TokenStore};
use crate::updates::UpdateSource;

/// Connection options. Defaults: TLS on, proactive refresh on, in-memory
/// token store, no close callback.
pub struct ConnectParams {
    pub secure: bool,
    pub auto_refresh: bool,
    pub on_close: Option<CloseHandler>,
    pub store: Arc<dyn TokenStore>,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            secure: true,
            auto_refresh: true,
            on_close: None,
            store: Arc::new(MemoryStore::new()),
        }
    }
}

/// Build the socket and HTTP endpoints for a schema-less host.
fn endpoints(host: &str, secure: bool) -> Result<(String, String), Error> {
    if host.contains("://") {
        return Err(Error::InvalidHost(host.to_owned()));
    }
    let (ws_scheme, http_scheme) = if secure { ("wss", "https") } else { ("ws", "http") };
    Ok((format!("{ws_scheme}://{host}/connect"), format!("{http_scheme}://{host}")))
}

/// A connected client: one socket, one credential manager, one event bus.
pub struct Api {
    channel: Arc<RpcChannel>,
    bus: Arc<EventBus>,
    credentials: Arc<CredentialManager>,
}

impl Api {
    /// Open the socket to `host` (`host[:port]`, no scheme) and wire up the
    /// runtime.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidHost`] when the host carries a scheme;
    /// [`Error::WsTransport`] when the handshake fails.
    pub async fn connect(host: &str, params: ConnectParams) -> Result<Self, Error> {
        let (ws_url, http_base) = endpoints(host, params.secure)?;
        let (ws, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|error| Error::WsTransport(Box::new(error)))?;

        let bus = Arc::new(EventBus::new());
        let channel = Arc::new(RpcChannel::spawn(ws, Arc::clone(&bus), params.on_close));
        let credentials = CredentialManager::new(
            http_base,
            Arc::clone(&channel) as Arc<dyn AuthRpc>,
            params.store,
            Arc::clone(&bus),
            params.auto_refresh,
        );
        // A dead socket has no use for a refresh timer.
        bus.once(Topic::Closed, {
            let credentials = Arc::clone(&credentials);
            Arc::new(move |_| credentials.cancel_refresh())
        });

        Ok(Self { channel, bus, credentials })
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    pub async fn close(&self) {
        self.channel.close().await;
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: Value) -> Result<T, Error> {
        let response = self.channel.send(method, payload).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn account_info(&self) -> Result<AccountInfo, Error> {
        self.call("account_info", json!({})).await
    }

    /// Open a game session with an initial deposit and first action.
    ///
    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn new_game(
        &self,
        casino_id: &str,
        game_id: &str,
        deposit: &str,
        action_type: u32,
        action_params: &[i64],
    ) -> Result<GameSession, Error> {
        self.call(
            "new_game",
            json!({
                "deposit": deposit,
                "actionType": action_type,
                "actionParams": action_params,
                "casinoId": casino_id,
                "gameId": game_id,
            }),
        )
        .await
    }

    /// Submit an in-session action, optionally with an extra deposit.
    ///
    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn game_action(
        &self,
        session_id: &str,
        action_type: u32,
        params: &[i64],
        deposit: &str,
    ) -> Result<(), Error> {
        self.channel
            .send(
                "game_action",
                json!({
                    "sessionId": session_id,
                    "actionType": action_type,
                    "params": params,
                    "deposit": deposit,
                }),
            )
            .await?;
        Ok(())
    }

    /// Subscribe this connection to session update pushes.
    ///
    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn subscribe(&self) -> Result<(), Error> {
        self.channel.send("subscribe", json!({})).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn fetch_games(&self) -> Result<Vec<Game>, Error> {
        self.call("fetch_games", json!({})).await
    }

    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn fetch_casinos(&self) -> Result<Vec<Casino>, Error> {
        self.call("fetch_casinos", json!({})).await
    }

    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn fetch_games_in_casino(&self, casino_id: &str) -> Result<Vec<CasinoGame>, Error> {
        self.call("fetch_games_in_casino", json!({ "casinoId": casino_id })).await
    }

    /// Sessions of the authenticated player.
    ///
    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn fetch_sessions(&self) -> Result<Vec<GameSession>, Error> {
        self.call("fetch_sessions", json!({})).await
    }

    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn fetch_global_sessions(
        &self,
        filter: SessionFilter,
    ) -> Result<Vec<GameSession>, Error> {
        self.call("fetch_global_sessions", json!({ "filter": filter })).await
    }

    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn fetch_casino_sessions(
        &self,
        filter: SessionFilter,
        casino_id: &str,
    ) -> Result<Vec<GameSession>, Error> {
        self.call(
            "fetch_casino_sessions",
            json!({ "filter": filter, "casinoId": casino_id }),
        )
        .await
    }

    /// The full update log of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Any socket or protocol error.
    pub async fn fetch_session_updates(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionUpdate>, Error> {
        self.call("fetch_session_updates", json!({ "sessionId": session_id })).await
    }
}

#[async_trait]
impl UpdateSource for Api {
    async fn fetch_session_updates(&self, session_id: &str) -> Result<Vec<SessionUpdate>, Error> {
        Api::fetch_session_updates(self, session_id).await
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
