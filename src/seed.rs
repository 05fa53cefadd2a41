//! Bootstraps the ADMIN role and account on startup.

use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Permission;

/// When `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set, makes sure an ADMIN role
/// holding every permission exists and that the given account holds it.
/// Without them this is a no-op, so a fresh deployment opts in explicitly.
pub async fn ensure_admin_account(pool: &PgPool) -> anyhow::Result<()> {
    let (email, password) = match (
        std::env::var("ADMIN_EMAIL"),
        std::env::var("ADMIN_PASSWORD"),
    ) {
        (Ok(email), Ok(password)) => (email, password),
        _ => return Ok(()),
    };

    let all_permissions: Vec<&str> = Permission::ALL
        .iter()
        .map(|permission| permission.name)
        .collect();
    let role_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO roles (id, name, permissions) VALUES ($1, 'ADMIN', $2)
         ON CONFLICT (name) DO UPDATE SET permissions = EXCLUDED.permissions
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(serde_json::to_string(&all_permissions)?)
    .fetch_one(pool)
    .await?;

    let pass_hash =
        bcrypt::hash(&password, bcrypt::DEFAULT_COST).context("Failed to hash admin password")?;
    let user_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (id, name, email, pass_hash, role, must_change_password)
         VALUES ($1, 'Admin', $2, $3, 'ADMIN', FALSE)
         ON CONFLICT (email) DO UPDATE SET role = 'ADMIN'
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&pass_hash)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(role_id)
    .execute(pool)
    .await?;

    tracing::info!(%email, "ensured admin account");

    Ok(())
}
