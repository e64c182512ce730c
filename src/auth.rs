//! Session credential manager: token pair lifecycle and proactive refresh.
//!
//! DESIGN
//! ======
//! The manager owns the current [`TokenPair`] and the single refresh timer.
//! Refresh is proactive: the access token's `exp` claim is decoded locally
//! (signature validation disabled — the client holds no key) and the timer
//! fires a margin before expiry. Refresh tokens are single-use on the
//! backend, so exchanges are deduplicated: a refresh token that was already
//! spent returns the cached resulting pair instead of starting a second live
//! chain.
//!
//! Tokens are never logged and leave the process only through the `/auth`
//! and `/refresh_token` endpoints and the socket's `auth` method.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bus::{Event, EventBus};
use crate::channel::RpcChannel;
use crate::error::Error;
use crate::models::{AccountInfo, TokenPair};
use crate::proto::RestEnvelope;
use crate::store::{ACCESS_TOKEN_KEY, AFFILIATE_ID_KEY, REFRESH_TOKEN_KEY, TokenStore};

/// The refresh timer fires this long before the access token's `exp`.
pub const PRE_REFRESH_MARGIN_MS: i64 = 10_000;
/// Transient refresh failures tolerated before the timer gives up.
pub const TOKEN_REFRESH_ATTEMPTS: u32 = 10;

/// The slice of the RPC channel the credential manager depends on.
#[async_trait]
pub trait AuthRpc: Send + Sync {
    fn is_open(&self) -> bool;
    async fn auth(&self, access_token: &str) -> Result<AccountInfo, Error>;
}

#[async_trait]
impl AuthRpc for RpcChannel {
    fn is_open(&self) -> bool {
        RpcChannel::is_open(self)
    }

    async fn auth(&self, access_token: &str) -> Result<AccountInfo, Error> {
        let payload = self.send("auth", json!({ "token": access_token })).await?;
        Ok(serde_json::from_value(payload)?)
    }
}

pub struct CredentialManager {
    http: reqwest::Client,
    http_base: String,
    rpc: Arc<dyn AuthRpc>,
    store: Arc<dyn TokenStore>,
    bus: Arc<EventBus>,
    auto_refresh: bool,
    current: Mutex<Option<TokenPair>>,
    /// Spent refresh token -> the pair it produced. Held across the HTTP
    /// exchange so a concurrent refresh of the same token awaits the first
    /// exchange and then hits the cache.
    refreshed: AsyncMutex<HashMap<String, TokenPair>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    failures: AtomicU32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CredentialManager {
    #[must_use]
    pub fn new(
        http_base: String,
        rpc: Arc<dyn AuthRpc>,
        store: Arc<dyn TokenStore>,
        bus: Arc<EventBus>,
        auto_refresh: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            http: reqwest::Client::new(),
            http_base,
            rpc,
            store,
            bus,
            auto_refresh,
            current: Mutex::new(None),
            refreshed: AsyncMutex::new(HashMap::new()),
            timer: Mutex::new(None),
            failures: AtomicU32::new(0),
        })
    }

    /// Read a previously persisted pair from the token store, if both halves
    /// are present. Does not validate or adopt it.
    #[must_use]
    pub fn restore(&self) -> Option<TokenPair> {
        let access_token = self.store.get(ACCESS_TOKEN_KEY)?;
        let refresh_token = self.store.get(REFRESH_TOKEN_KEY)?;
        Some(TokenPair { access_token, refresh_token })
    }

    /// The pair adopted by the last successful authenticate or refresh.
    #[must_use]
    pub fn tokens(&self) -> Option<TokenPair> {
        lock(&self.current).clone()
    }

    /// Persist an affiliate id; it is forwarded once on the next
    /// [`Self::obtain_token`] and erased.
    pub fn set_affiliate_id(&self, id: &str) {
        self.store.set(AFFILIATE_ID_KEY, id);
    }

    /// Exchange a one-time proof token for a [`TokenPair`].
    ///
    /// # Errors
    ///
    /// Fails when the endpoint rejects the proof or cannot be reached.
    pub async fn obtain_token(
        &self,
        tmp_token: &str,
        casino_name: &str,
    ) -> Result<TokenPair, Error> {
        let mut payload = json!({ "tmpToken": tmp_token, "casinoName": casino_name });
        if let Some(affiliate_id) = self.store.get(AFFILIATE_ID_KEY) {
            payload["affiliateID"] = Value::String(affiliate_id);
            self.store.remove(AFFILIATE_ID_KEY);
        }
        let response = self.post("/auth", &payload).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Exchange a refresh token for a new pair. A token that was already
    /// exchanged returns the cached result instead of hitting the endpoint;
    /// concurrent exchanges of the same token share a single request.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint rejects the refresh token or cannot be
    /// reached. [`Error::is_authoritative_auth_failure`] distinguishes a dead
    /// chain from a transient failure.
    pub async fn refresh(&self, pair: &TokenPair) -> Result<TokenPair, Error> {
        let mut refreshed = self.refreshed.lock().await;
        if let Some(cached) = refreshed.get(&pair.refresh_token) {
            debug!("refresh token already exchanged, returning cached pair");
            return Ok(cached.clone());
        }
        let payload = json!({ "refreshToken": pair.refresh_token });
        let response = self.post("/refresh_token", &payload).await?;
        let fresh: TokenPair = serde_json::from_value(response)?;
        refreshed.insert(pair.refresh_token.clone(), fresh.clone());
        Ok(fresh)
    }

    /// Authenticate the socket with the pair's access token.
    ///
    /// On [`Error::TokenExpired`], refreshes once and retries; a successful
    /// retry emits exactly one [`Event::TokensUpdate`]. If the refresh or the
    /// retry fails, the original token-expired error is returned, and an
    /// authoritative refresh failure erases persisted credentials first.
    ///
    /// # Errors
    ///
    /// Any socket or protocol error from the `auth` call, or the original
    /// [`Error::TokenExpired`] when the single refresh-and-retry fails.
    pub async fn authenticate(self: &Arc<Self>, pair: TokenPair) -> Result<AccountInfo, Error> {
        let expired = match self.rpc.auth(&pair.access_token).await {
            Ok(info) => {
                self.adopt(&pair);
                return Ok(info);
            }
            Err(error @ Error::TokenExpired(_)) => error,
            Err(error) => return Err(error),
        };

        let fresh = match self.refresh(&pair).await {
            Ok(fresh) => fresh,
            Err(refresh_error) => {
                if refresh_error.is_authoritative_auth_failure() {
                    self.erase_tokens();
                }
                return Err(expired);
            }
        };
        match self.rpc.auth(&fresh.access_token).await {
            Ok(info) => {
                self.adopt(&fresh);
                self.bus.emit(&Event::TokensUpdate(fresh));
                Ok(info)
            }
            Err(retry_error) => {
                warn!(%retry_error, "auth retry after refresh failed");
                Err(expired)
            }
        }
    }

    /// End the session server-side and erase persisted credentials.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint rejects the request; credentials are kept in
    /// that case.
    pub async fn logout(&self, pair: &TokenPair) -> Result<(), Error> {
        self.post("/logout", &json!({ "accessToken": pair.access_token })).await?;
        self.erase_tokens();
        Ok(())
    }

    /// Opt the account out of data collection and erase persisted
    /// credentials.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint rejects the request; credentials are kept in
    /// that case.
    pub async fn optout(&self, pair: &TokenPair) -> Result<(), Error> {
        self.post("/optout", &json!({ "accessToken": pair.access_token })).await?;
        self.erase_tokens();
        Ok(())
    }

    /// Abort the refresh timer, if armed.
    pub fn cancel_refresh(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }

    /// Drop the current pair and remove it from the token store.
    pub fn erase_tokens(&self) {
        self.cancel_refresh();
        *lock(&self.current) = None;
        self.store.remove(ACCESS_TOKEN_KEY);
        self.store.remove(REFRESH_TOKEN_KEY);
    }

    fn adopt(self: &Arc<Self>, pair: &TokenPair) {
        *lock(&self.current) = Some(pair.clone());
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token);
        self.store.set(REFRESH_TOKEN_KEY, &pair.refresh_token);
        self.failures.store(0, Ordering::SeqCst);
        if self.auto_refresh {
            self.plan_refresh(&pair.access_token);
        }
    }

    /// Arm the refresh timer for the margin before the token's expiry.
    /// Replaces any previously armed timer; a no-op when the socket is
    /// closed or the token's `exp` claim cannot be read.
    fn plan_refresh(self: &Arc<Self>, access_token: &str) {
        let delay_ms = match decode_exp_ms(access_token) {
            Ok(exp_ms) => refresh_delay_ms(exp_ms, now_ms()),
            Err(error) => {
                warn!(%error, "cannot schedule token refresh");
                return;
            }
        };
        if !self.rpc.is_open() {
            debug!("socket closed, not arming refresh timer");
            return;
        }
        let mut timer = lock(&self.timer);
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        let this = Arc::clone(self);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            this.run_refresh().await;
        }));
        debug!(delay_ms, "refresh timer armed");
    }

    async fn run_refresh(self: &Arc<Self>) {
        let Some(pair) = self.tokens() else {
            return;
        };
        match self.refresh(&pair).await {
            Ok(fresh) => {
                self.adopt(&fresh);
                self.bus.emit(&Event::TokensUpdate(fresh));
            }
            Err(error) if error.is_authoritative_auth_failure() => {
                warn!(%error, "refresh token rejected, erasing credentials");
                self.erase_tokens();
            }
            Err(error) => {
                let attempts = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                if attempts >= TOKEN_REFRESH_ATTEMPTS {
                    warn!(%error, attempts, "token refresh abandoned");
                } else {
                    warn!(%error, attempts, "token refresh failed, retrying");
                    self.plan_refresh(&pair.access_token);
                }
            }
        }
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<Value, Error> {
        let url = format!("{}{path}", self.http_base);
        let response = self.http.post(url).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        process_response(status, &body)
    }
}

/// Interpret an auth endpoint's body. Endpoints return either the envelope
/// `{"response": T|null, "error": {code, message}|null}` or a bare legacy
/// value; non-JSON bodies are passed through on HTTP success and synthesized
/// into an error from the status code otherwise.
pub(crate) fn process_response(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<Value, Error> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        if status.is_success() {
            return Ok(Value::String(body.to_owned()));
        }
        return Err(Error::from_http(i64::from(status.as_u16()), body.to_owned()));
    };

    // An envelope carries both keys; a bare legacy body may have either one
    // as an ordinary field.
    let is_envelope = value
        .as_object()
        .is_some_and(|obj| obj.contains_key("response") && obj.contains_key("error"));
    if is_envelope {
        let envelope: RestEnvelope = serde_json::from_value(value)?;
        if let Some(error) = envelope.error {
            return Err(Error::from_http(error.code, error.message));
        }
        return Ok(envelope.response.unwrap_or(Value::Null));
    }

    if status.is_success() {
        Ok(value)
    } else {
        Err(Error::from_http(i64::from(status.as_u16()), body.to_owned()))
    }
}

#[derive(Deserialize)]
struct ExpClaim {
    exp: i64,
}

/// Decode the `exp` claim (seconds since epoch) from an access token,
/// returned in milliseconds. The signature is not verified.
pub(crate) fn decode_exp_ms(access_token: &str) -> Result<i64, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    let key = DecodingKey::from_secret(&[]);
    let data = jsonwebtoken::decode::<ExpClaim>(access_token, &key, &validation)
        .map_err(|error| Error::InvalidToken(error.to_string()))?;
    Ok(data.claims.exp * 1000)
}

/// Milliseconds to wait before refreshing a token that expires at `exp_ms`,
/// clamped at zero.
pub(crate) fn refresh_delay_ms(exp_ms: i64, now_ms: i64) -> u64 {
    u64::try_from(exp_ms - now_ms - PRE_REFRESH_MARGIN_MS).unwrap_or(0)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
