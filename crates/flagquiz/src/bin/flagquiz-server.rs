//! flagquiz server.
//!
//! Serves the HTTP room API and the game WebSocket on separate listeners.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin flagquiz-server
//! cargo run --bin flagquiz-server -- --http-addr 0.0.0.0:8080 --ws-addr 0.0.0.0:8081
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use flagquiz::logging::setup_logger;
use flagquiz::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "flagquiz-server")]
#[command(about = "Real-time multiplayer flag quiz server", long_about = None)]
struct Args {
    /// Address for the game WebSocket listener
    #[arg(long, default_value = "127.0.0.1:8081")]
    ws_addr: String,

    /// Address for the HTTP room API
    #[arg(long, default_value = "127.0.0.1:8080")]
    http_addr: String,

    /// CSV file of `name,code` rows; the bundled list is used if omitted
    #[arg(long)]
    countries: Option<PathBuf>,

    /// Maximum number of live rooms
    #[arg(long, default_value_t = 10)]
    max_rooms: usize,

    /// Maximum players per room
    #[arg(long, default_value_t = 9)]
    max_players: usize,

    /// Who decides scores
    #[arg(long, value_enum, default_value_t = ScoringMode::ServerAuthoritative)]
    scoring: ScoringMode,

    /// Seconds an unjoined room is kept before it is removed
    #[arg(long, default_value_t = 300)]
    abandoned_room_ttl: u64,
}

#[tokio::main]
async fn main() {
    setup_logger("flagquiz_server", "info");

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), FlagQuizError> {
    let mut builder = QuizServer::builder()
        .bind(&args.ws_addr)
        .http(&args.http_addr)
        .registry_config(RegistryConfig {
            max_rooms: args.max_rooms,
            max_players: args.max_players,
            ..RegistryConfig::default()
        })
        .game_settings(GameSettings {
            scoring: args.scoring,
            ..GameSettings::default()
        })
        .abandoned_room_ttl(Duration::from_secs(args.abandoned_room_ttl));

    if let Some(path) = &args.countries {
        let bank = QuestionBank::load(path).await?;
        tracing::info!(path = %path.display(), countries = bank.len(), "loaded country list");
        builder = builder.question_bank(bank);
    }

    let server = builder.build().await?;
    server.run().await
}
