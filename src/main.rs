use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reel_api_rust::cli::{Args, StorageKind};
use reel_api_rust::database::{manager, Stores};
use reel_api_rust::middleware::install_panic_hook;
use reel_api_rust::routes;
use reel_api_rust::server::Server;
use reel_api_rust::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, LIMITER_RPS, etc.
    let _ = dotenvy::dotenv();

    init_tracing();
    install_panic_hook();

    let args = Args::parse();
    let config = args.load_config();
    tracing::info!(environment = config.environment.as_str(), storage = ?args.storage, "starting reel api");

    let stores = match args.storage {
        StorageKind::Postgres => {
            let pool = manager::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            Stores::postgres(pool, config.query_timeout())
        }
        StorageKind::Memory => Stores::memory(),
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, stores).context("invalid configuration")?;
    let server = Server::new(&state);

    server.serve(&bind_addr, routes::app(state)).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
