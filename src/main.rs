use std::net::SocketAddr;

use anyhow::Result;
use quest_ledger::{Accounts, AppState, config::Config, init_router, init_store};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let store = init_store(&config).await?;
    let app_state = AppState {
        accounts: Accounts::new(store),
    };

    let addr: SocketAddr = ([0, 0, 0, 0], config.server_port).into();
    let listener = TcpListener::bind(addr).await?;

    let app = init_router(app_state);

    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
