use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use gamelink::{Api, ConnectParams, GameService, SessionFilter, TokenPair, UpdateKind};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing credentials; pass --access-token/--refresh-token or --tmp-token")]
    MissingCredentials,
    #[error("missing casino name; pass --casino-name or set GAMELINK_CASINO_NAME")]
    MissingCasinoName,
    #[error("game `{0}` is not offered by this casino")]
    GameNotFound(String),
    #[error(transparent)]
    Client(#[from] gamelink::Error),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "gamelink", about = "Game platform client CLI")]
struct Cli {
    /// Platform host, schema-less (`host[:port]`).
    #[arg(long, env = "GAMELINK_HOST")]
    host: String,

    /// Use plain ws/http instead of wss/https.
    #[arg(long, env = "GAMELINK_INSECURE", default_value_t = false)]
    insecure: bool,

    #[arg(long, env = "GAMELINK_ACCESS_TOKEN")]
    access_token: Option<String>,

    #[arg(long, env = "GAMELINK_REFRESH_TOKEN")]
    refresh_token: Option<String>,

    /// One-time proof token to exchange for a token pair.
    #[arg(long, env = "GAMELINK_TMP_TOKEN")]
    tmp_token: Option<String>,

    #[arg(long, env = "GAMELINK_CASINO_NAME")]
    casino_name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticated account details.
    Account,
    /// All games on the platform.
    Games,
    /// All casinos on the platform.
    Casinos,
    /// Games offered by one casino.
    CasinoGames { casino_id: String },
    /// The player's sessions, or global/casino listings with --filter.
    Sessions {
        #[arg(long)]
        casino_id: Option<String>,
        #[arg(long, value_enum)]
        filter: Option<FilterArg>,
    },
    /// Update log of a session.
    Updates { session_id: String },
    /// Play one round and print the finishing update.
    Play {
        #[arg(long)]
        casino_id: String,
        #[arg(long)]
        game_id: String,
        #[arg(long, default_value = "1.0000 BET")]
        deposit: String,
        #[arg(long, default_value_t = 0)]
        action_type: u32,
        #[arg(long, value_delimiter = ',')]
        params: Vec<i64>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Wins,
    Losts,
}

impl From<FilterArg> for SessionFilter {
    fn from(filter: FilterArg) -> Self {
        match filter {
            FilterArg::All => Self::All,
            FilterArg::Wins => Self::Wins,
            FilterArg::Losts => Self::Losts,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let params = ConnectParams { secure: !cli.insecure, ..ConnectParams::default() };
    let api = Arc::new(Api::connect(&cli.host, params).await?);
    authenticate(&api, &cli).await?;

    let result = match &cli.command {
        Command::Account => run_account(&api).await,
        Command::Games => run_games(&api).await,
        Command::Casinos => run_casinos(&api).await,
        Command::CasinoGames { casino_id } => run_casino_games(&api, casino_id).await,
        Command::Sessions { casino_id, filter } => {
            run_sessions(&api, casino_id.as_deref(), *filter).await
        }
        Command::Updates { session_id } => run_updates(&api, session_id).await,
        Command::Play { casino_id, game_id, deposit, action_type, params } => {
            run_play(&api, casino_id, game_id, deposit, *action_type, params).await
        }
    };

    api.close().await;
    result
}

async fn authenticate(api: &Api, cli: &Cli) -> Result<(), CliError> {
    let pair = if let (Some(access), Some(refresh)) = (&cli.access_token, &cli.refresh_token) {
        TokenPair { access_token: access.clone(), refresh_token: refresh.clone() }
    } else if let Some(tmp_token) = &cli.tmp_token {
        let casino_name = cli.casino_name.as_deref().ok_or(CliError::MissingCasinoName)?;
        api.credentials().obtain_token(tmp_token, casino_name).await?
    } else if let Some(restored) = api.credentials().restore() {
        restored
    } else {
        return Err(CliError::MissingCredentials);
    };

    let info = api.credentials().authenticate(pair).await?;
    eprintln!("authenticated as {}", info.account_name);
    Ok(())
}

async fn run_account(api: &Api) -> Result<(), CliError> {
    print_json(&serde_json::to_value(api.account_info().await?)?)
}

async fn run_games(api: &Api) -> Result<(), CliError> {
    print_json(&serde_json::to_value(api.fetch_games().await?)?)
}

async fn run_casinos(api: &Api) -> Result<(), CliError> {
    print_json(&serde_json::to_value(api.fetch_casinos().await?)?)
}

async fn run_casino_games(api: &Api, casino_id: &str) -> Result<(), CliError> {
    print_json(&serde_json::to_value(api.fetch_games_in_casino(casino_id).await?)?)
}

async fn run_sessions(
    api: &Api,
    casino_id: Option<&str>,
    filter: Option<FilterArg>,
) -> Result<(), CliError> {
    let sessions = match (casino_id, filter) {
        (Some(casino_id), filter) => {
            let filter = filter.map_or(SessionFilter::All, SessionFilter::from);
            api.fetch_casino_sessions(filter, casino_id).await?
        }
        (None, Some(filter)) => api.fetch_global_sessions(filter.into()).await?,
        (None, None) => api.fetch_sessions().await?,
    };
    print_json(&serde_json::to_value(sessions)?)
}

async fn run_updates(api: &Api, session_id: &str) -> Result<(), CliError> {
    print_json(&serde_json::to_value(api.fetch_session_updates(session_id).await?)?)
}

async fn run_play(
    api: &Arc<Api>,
    casino_id: &str,
    game_id: &str,
    deposit: &str,
    action_type: u32,
    params: &[i64],
) -> Result<(), CliError> {
    api.subscribe().await?;

    let games = api.fetch_games_in_casino(casino_id).await?;
    let game = games
        .into_iter()
        .find(|game| game.game_id == game_id)
        .ok_or_else(|| CliError::GameNotFound(game_id.to_owned()))?;

    let service = GameService::new(Arc::clone(api), &game, casino_id);
    eprintln!("balance before: {}", service.balance().await?);

    let update = service
        .start_game(deposit, action_type, params, &[UpdateKind::GameFinished])
        .await?;

    eprintln!("balance after: {}", service.balance().await?);
    print_json(&serde_json::to_value(update)?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
