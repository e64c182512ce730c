//! Pluggable persistence for credentials.
//!
//! The credential manager reads and writes tokens through [`TokenStore`] so
//! hosts can supply whatever persistence they have (keychain, file, browser
//! storage). [`MemoryStore`] is the default and keeps everything in-process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Storage key for the short-lived access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key for the long-lived refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key for the one-shot affiliate id forwarded on first obtain.
pub const AFFILIATE_ID_KEY: &str = "affiliate_id";

/// Key/value persistence for tokens. Implementations must be cheap to call;
/// the credential manager invokes these on its hot paths.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory [`TokenStore`]. Contents are lost when dropped.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
