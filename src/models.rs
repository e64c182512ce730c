//! Domain models mirroring the backend's JSON shapes (camelCase on the wire).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// Access + refresh token pair issued by the auth endpoint.
///
/// The access token is a JWT carrying an `exp` claim (seconds since epoch);
/// the refresh token is opaque and single-use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Kind discriminator on a session update, a small closed integer enum on
/// the wire. Out-of-range values are a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateKind {
    SessionCreated,
    GameStarted,
    ActionRequested,
    GameMessage,
    GameFinished,
    GameFailed,
}

impl UpdateKind {
    /// Wire integer for this kind.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        match self {
            Self::SessionCreated => 0,
            Self::GameStarted => 1,
            Self::ActionRequested => 2,
            Self::GameMessage => 3,
            Self::GameFinished => 4,
            Self::GameFailed => 5,
        }
    }

    /// Parse a kind from its wire integer.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::SessionCreated),
            1 => Some(Self::GameStarted),
            2 => Some(Self::ActionRequested),
            3 => Some(Self::GameMessage),
            4 => Some(Self::GameFinished),
            5 => Some(Self::GameFailed),
            _ => None,
        }
    }
}

impl Serialize for UpdateKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_u32())
    }
}

impl<'de> Deserialize<'de> for UpdateKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        Self::from_u32(value)
            .ok_or_else(|| D::Error::custom(format!("invalid update kind: {value}")))
    }
}

/// A discrete, timestamped event describing progress of a remote game
/// session. Immutable once observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub session_id: String,
    #[serde(rename = "updateType")]
    pub update_kind: UpdateKind,
    /// ISO-8601, comparable lexicographically and chronologically.
    pub timestamp: String,
    #[serde(default)]
    pub data: Value,
}

/// Lifecycle state of a game session as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NewGameTrxSent,
    GameStartedInBc,
    RequestedGameAction,
    GameActionTrxSent,
    SignidicePartOneTrxSent,
    GameFinished,
    GameFailed,
}

impl SessionState {
    #[must_use]
    pub fn as_u32(self) -> u32 {
        match self {
            Self::NewGameTrxSent => 0,
            Self::GameStartedInBc => 1,
            Self::RequestedGameAction => 2,
            Self::GameActionTrxSent => 3,
            Self::SignidicePartOneTrxSent => 4,
            Self::GameFinished => 5,
            Self::GameFailed => 6,
        }
    }

    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::NewGameTrxSent),
            1 => Some(Self::GameStartedInBc),
            2 => Some(Self::RequestedGameAction),
            3 => Some(Self::GameActionTrxSent),
            4 => Some(Self::SignidicePartOneTrxSent),
            5 => Some(Self::GameFinished),
            6 => Some(Self::GameFailed),
            _ => None,
        }
    }
}

impl Serialize for SessionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_u32())
    }
}

impl<'de> Deserialize<'de> for SessionState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        Self::from_u32(value)
            .ok_or_else(|| D::Error::custom(format!("invalid session state: {value}")))
    }
}

/// Per-casino bonus balance entry on [`AccountInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusBalance {
    pub balance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_name: String,
    #[serde(default)]
    pub email: String,
    pub balance: String,
    #[serde(default)]
    pub active_permission: String,
    #[serde(default)]
    pub owner_permission: String,
    #[serde(default)]
    pub linked_casinos: Vec<Casino>,
    #[serde(default)]
    pub bonus_balances: Option<HashMap<String, BonusBalance>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Casino {
    pub id: String,
    pub contract: String,
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub contract: String,
    pub params_cnt: u32,
    pub paused: i64,
    #[serde(default)]
    pub meta: Value,
}

/// One parameter descriptor for a game (type discriminator + raw value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameParams {
    #[serde(rename = "type")]
    pub param_type: u32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasinoGame {
    pub game_id: String,
    pub paused: bool,
    pub params: Vec<GameParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub player: String,
    #[serde(rename = "casinoID")]
    pub casino_id: String,
    #[serde(rename = "gameID")]
    pub game_id: String,
    #[serde(rename = "blockchainSesID", default)]
    pub blockchain_ses_id: String,
    pub state: SessionState,
    #[serde(rename = "lastUpdate", default)]
    pub last_update: i64,
    pub deposit: String,
    #[serde(rename = "playerWinAmount", default)]
    pub player_win_amount: Option<String>,
}

/// Filter accepted by the global / per-casino session listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionFilter {
    All,
    Wins,
    Losts,
}

impl SessionFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Wins => "wins",
            Self::Losts => "losts",
        }
    }
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
