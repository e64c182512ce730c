//! Game round service: issue a game RPC, then wait for the updates that
//! settle it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::Api;
use crate::error::Error;
use crate::models::{CasinoGame, GameParams, GameSession, SessionUpdate, UpdateKind};
use crate::updates::{UpdateReconciler, UpdateSource};

/// Parse a `"1.5000 BET"` money string into its numeric amount. A missing
/// suffix is tolerated.
///
/// # Errors
///
/// [`Error::InvalidBet`] when the numeric part does not parse.
pub fn parse_bet(text: &str) -> Result<f64, Error> {
    let numeric = text.strip_suffix("BET").map_or(text, str::trim_end);
    numeric
        .trim()
        .parse()
        .map_err(|_| Error::InvalidBet(text.to_owned()))
}

/// Format an amount as a money string: at most four decimals, truncated (not
/// rounded), zero-padded, with the `BET` suffix.
#[must_use]
pub fn format_bet(amount: f64) -> String {
    let text = format!("{amount}");
    let (integer, decimals) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let decimals: String = decimals.chars().take(4).collect();
    format!("{integer}.{decimals:0<4} BET")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Plays one game at one casino over a connected [`Api`], tracking the
/// active session between actions.
pub struct GameService {
    api: Arc<Api>,
    reconciler: UpdateReconciler,
    casino_id: String,
    game_id: String,
    game_params: Vec<GameParams>,
    session: Mutex<Option<GameSession>>,
}

impl GameService {
    #[must_use]
    pub fn new(api: Arc<Api>, game: &CasinoGame, casino_id: &str) -> Self {
        let reconciler = UpdateReconciler::new(
            Arc::clone(api.bus()),
            Arc::clone(&api) as Arc<dyn UpdateSource>,
        );
        Self {
            api,
            reconciler,
            casino_id: casino_id.to_owned(),
            game_id: game.game_id.clone(),
            game_params: game.params.clone(),
            session: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn game_params(&self) -> &[GameParams] {
        &self.game_params
    }

    /// The session opened by the last [`Self::start_game`] call.
    #[must_use]
    pub fn session(&self) -> Option<GameSession> {
        lock(&self.session).clone()
    }

    /// The player's balance, with this casino's bonus balance added in when
    /// present.
    ///
    /// # Errors
    ///
    /// Any socket or protocol error from `account_info`.
    pub async fn balance(&self) -> Result<String, Error> {
        let info = self.api.account_info().await?;
        let bonus = info
            .bonus_balances
            .as_ref()
            .and_then(|balances| balances.get(&self.casino_id))
            .and_then(|entry| entry.balance.as_deref());
        match bonus {
            Some(bonus) => Ok(format_bet(parse_bet(&info.balance)? + parse_bet(bonus)?)),
            None => Ok(info.balance),
        }
    }

    /// # Errors
    ///
    /// Any socket or protocol error from `account_info`.
    pub async fn account_name(&self) -> Result<String, Error> {
        Ok(self.api.account_info().await?.account_name)
    }

    /// Open a session with a deposit and first action, then wait for the
    /// first update of one of `kinds`.
    ///
    /// # Errors
    ///
    /// Any error from the RPC or from the wait.
    pub async fn start_game(
        &self,
        deposit: &str,
        action_type: u32,
        params: &[i64],
        kinds: &[UpdateKind],
    ) -> Result<SessionUpdate, Error> {
        let session_id = self.open_session(deposit, action_type, params).await?;
        self.reconciler.wait_for(&session_id, kinds).await
    }

    /// Like [`Self::start_game`], but waits for one update of every kind in
    /// `kinds`, returned in arrival order.
    ///
    /// # Errors
    ///
    /// Any error from the RPC or from the waits.
    pub async fn start_game_multi(
        &self,
        deposit: &str,
        action_type: u32,
        params: &[i64],
        kinds: &[UpdateKind],
    ) -> Result<Vec<SessionUpdate>, Error> {
        let session_id = self.open_session(deposit, action_type, params).await?;
        self.reconciler.wait_for_all(&session_id, kinds).await
    }

    /// Submit an action on the active session, then wait for the first
    /// update of one of `kinds`.
    ///
    /// # Errors
    ///
    /// [`Error::NoActiveSession`] when no game was started; otherwise any
    /// error from the RPC or from the wait.
    pub async fn action(
        &self,
        action_type: u32,
        params: &[i64],
        deposit: &str,
        kinds: &[UpdateKind],
    ) -> Result<SessionUpdate, Error> {
        let session_id = self.active_session_id()?;
        self.api.game_action(&session_id, action_type, params, deposit).await?;
        self.reconciler.wait_for(&session_id, kinds).await
    }

    /// Like [`Self::action`], but waits for one update of every kind in
    /// `kinds`, returned in arrival order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::action`].
    pub async fn action_multi(
        &self,
        action_type: u32,
        params: &[i64],
        deposit: &str,
        kinds: &[UpdateKind],
    ) -> Result<Vec<SessionUpdate>, Error> {
        let session_id = self.active_session_id()?;
        self.api.game_action(&session_id, action_type, params, deposit).await?;
        self.reconciler.wait_for_all(&session_id, kinds).await
    }

    async fn open_session(
        &self,
        deposit: &str,
        action_type: u32,
        params: &[i64],
    ) -> Result<String, Error> {
        let session = self
            .api
            .new_game(&self.casino_id, &self.game_id, deposit, action_type, params)
            .await?;
        let session_id = session.id.clone();
        *lock(&self.session) = Some(session);
        Ok(session_id)
    }

    fn active_session_id(&self) -> Result<String, Error> {
        lock(&self.session)
            .as_ref()
            .map(|session| session.id.clone())
            .ok_or(Error::NoActiveSession)
    }
}

#[cfg(test)]
#[path = "round_test.rs"]
mod tests;
