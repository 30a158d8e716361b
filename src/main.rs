// Marketplace social server

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use marketplace_social::{
    api::create_router, app_state::AppState, config::Config,
    infrastructure::auth::InMemorySessions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(&config, Arc::new(InMemorySessions::new())).await?;
    let app = create_router(app_state);

    let addr = config.server_address();
    info!(%addr, "Marketplace social server starting");
    info!("  GET    /api/v1/users/{{id}}/profile        - Profile page");
    info!("  GET    /api/v1/users/{{id}}/follow         - Is the viewer following");
    info!("  POST   /api/v1/users/{{id}}/follow         - Follow");
    info!("  DELETE /api/v1/users/{{id}}/follow         - Unfollow");
    info!("  GET    /api/v1/users/{{id}}/follow-counts  - Follower/following counters");
    info!("  GET    /api/v1/users/{{id}}/reviews        - Reviews with average score");
    info!("  GET    /api/v1/listings/{{id}}             - Listing detail");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
