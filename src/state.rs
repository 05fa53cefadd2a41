use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::SessionKeys;

/// Shared state handed to every handler via an `Extension` layer.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub sessions: Arc<SessionKeys>,
    pub app_url: String,
}

impl AppState {
    pub async fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("`DATABASE_URL` not set")?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .context("Failed to connect to the database")?;

        let secret = std::env::var("SESSION_SECRET").context("`SESSION_SECRET` not set")?;
        let app_url =
            std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

        Ok(Self {
            pool,
            sessions: Arc::new(SessionKeys::new(secret.as_bytes())),
            app_url,
        })
    }
}
