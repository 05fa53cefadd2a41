//! The backend for an ensemble's attendance and membership app.

mod auth;
mod email;
mod error;
mod models;
mod routes;
mod seed;
mod state;
mod util;

use std::net::SocketAddr;

use axum::Extension;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fanfare=info")),
        )
        .init();

    let state = AppState::from_env().await?;
    sqlx::migrate!().run(&state.pool).await?;
    seed::ensure_admin_account(&state.pool).await?;

    let app = routes::router()
        .layer(Extension(state))
        .layer(CorsLayer::permissive());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
