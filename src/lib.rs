//! Client runtime for the game platform backend.
//!
//! One WebSocket carries all RPC traffic and server pushes; [`channel`]
//! multiplexes correlated request/response pairs over it and feeds
//! uncorrelated pushes into the [`bus`]. [`auth`] keeps the JWT token pair
//! alive with proactive refresh, [`updates`] reconciles session update
//! streams into exactly-once waits, and [`api`] / [`round`] are the typed
//! surface applications program against.
//!
//! ```no_run
//! use gamelink::{Api, ConnectParams, TokenPair};
//!
//! # async fn run() -> Result<(), gamelink::Error> {
//! let api = Api::connect("platform.example", ConnectParams::default()).await?;
//! let pair = TokenPair {
//!     access_token: "...".to_owned(),
//!     refresh_token: "...".to_owned(),
//! };
//! let info = api.credentials().authenticate(pair).await?;
//! println!("playing as {}", info.account_name);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod bus;
pub mod channel;
pub mod error;
pub mod models;
pub mod proto;
pub mod round;
pub mod store;
pub mod updates;

pub use api::{Api, ConnectParams};
pub use auth::CredentialManager;
pub use bus::{Event, EventBus, SubscriptionId, Topic};
pub use channel::{CloseHandler, RpcChannel};
pub use error::{Error, ErrorCode};
pub use models::{
    AccountInfo, Casino, CasinoGame, Game, GameParams, GameSession, SessionFilter, SessionState,
    SessionUpdate, TokenPair, UpdateKind,
};
pub use round::{GameService, format_bet, parse_bet};
pub use store::{MemoryStore, TokenStore};
pub use updates::{UpdateReconciler, UpdateSource};
