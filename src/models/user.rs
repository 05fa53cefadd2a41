use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::role::{Role, RoleResponse};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// The member's email, which must be unique
    pub email: String,
    pub pass_hash: String,
    /// Deprecated single-role shim; effective permissions come from the
    /// assigned role set
    pub role: String,
    pub instrument: Option<String>,
    pub membership_number: Option<String>,
    pub image: Option<String>,
    /// Forces the member through the password-change flow before anything else
    pub must_change_password: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
    pub instrument: Option<String>,
    pub role_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub instrument: Option<String>,
    pub role_ids: Option<Vec<Uuid>>,
}

/// A user as returned by the API, without the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub instrument: Option<String>,
    pub membership_number: Option<String>,
    pub image: Option<String>,
    pub must_change_password: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub roles: Vec<RoleResponse>,
}

const USER_COLUMNS: &str = "id, name, email, pass_hash, role, instrument, \
     membership_number, image, must_change_password, created_at";

impl User {
    pub fn into_response(self, roles: Vec<Role>) -> UserResponse {
        UserResponse {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            instrument: self.instrument,
            membership_number: self.membership_number,
            image: self.image,
            must_change_password: self.must_change_password,
            created_at: self.created_at,
            roles: roles.into_iter().map(Role::into_response).collect(),
        }
    }

    pub async fn with_id(id: Uuid, pool: &PgPool) -> ApiResult<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or(ApiError::NotFound("user"))
    }

    pub async fn with_id_opt(id: Uuid, pool: &PgPool) -> ApiResult<Option<Self>> {
        sqlx::query_as::<_, Self>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn with_email_opt(email: &str, pool: &PgPool) -> ApiResult<Option<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn all(pool: &PgPool) -> ApiResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn count(pool: &PgPool) -> ApiResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    /// Every member's email address, for event broadcasts.
    pub async fn email_addresses(pool: &PgPool) -> ApiResult<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT email FROM users")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(new_user: NewUser, pool: &PgPool) -> ApiResult<Self> {
        if new_user.name.is_empty() || new_user.email.is_empty() || new_user.password.is_empty() {
            return Err(ApiError::BadRequest(
                "name, email and password are required".to_owned(),
            ));
        }
        if Self::with_email_opt(&new_user.email, pool).await?.is_some() {
            return Err(ApiError::BadRequest(format!(
                "another member already uses the email {}",
                new_user.email
            )));
        }

        let pass_hash = hash_password(&new_user.password)?;
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO users (id, name, email, pass_hash, role, instrument, must_change_password)
             VALUES ($1, $2, $3, $4, $5, $6, TRUE)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&pass_hash)
        .bind(new_user.role.as_deref().unwrap_or("USER"))
        .bind(&new_user.instrument)
        .fetch_one(&mut tx)
        .await?;

        if let Some(role_ids) = &new_user.role_ids {
            assign_roles(user.id, role_ids, &mut tx).await?;
        }
        tx.commit().await?;

        Ok(user)
    }

    pub async fn update(id: Uuid, update: UserUpdate, pool: &PgPool) -> ApiResult<Self> {
        Self::with_id(id, pool).await?;

        let pass_hash = update
            .password
            .as_deref()
            .filter(|password| !password.is_empty())
            .map(hash_password)
            .transpose()?;

        let mut tx = pool.begin().await?;
        let user = sqlx::query_as::<_, Self>(&format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                instrument = COALESCE($5, instrument),
                pass_hash = COALESCE($6, pass_hash)
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.role)
        .bind(&update.instrument)
        .bind(&pass_hash)
        .fetch_one(&mut tx)
        .await?;

        if let Some(role_ids) = &update.role_ids {
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                .bind(id)
                .execute(&mut tx)
                .await?;
            assign_roles(id, role_ids, &mut tx).await?;
        }
        tx.commit().await?;

        Ok(user)
    }

    pub async fn delete(id: Uuid, pool: &PgPool) -> ApiResult<()> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if deleted.rows_affected() == 0 {
            Err(ApiError::NotFound("user"))
        } else {
            Ok(())
        }
    }

    /// Sets a new password and lets the member back into the rest of the API.
    pub async fn change_password(id: Uuid, password: &str, pool: &PgPool) -> ApiResult<()> {
        let pass_hash = hash_password(password)?;
        sqlx::query("UPDATE users SET pass_hash = $2, must_change_password = FALSE WHERE id = $1")
            .bind(id)
            .bind(&pass_hash)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.pass_hash).unwrap_or(false)
    }
}

fn hash_password(password: &str) -> ApiResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .context("Failed to hash password")
        .map_err(Into::into)
}

async fn assign_roles(
    user_id: Uuid,
    role_ids: &[Uuid],
    tx: &mut Transaction<'_, Postgres>,
) -> ApiResult<()> {
    for role_id in role_ids {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_passwords_verify() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Joe Schmoe".to_owned(),
            email: "joe.schmoe@gmail.com".to_owned(),
            pass_hash: hash_password("trombone4ever").unwrap(),
            role: "USER".to_owned(),
            instrument: Some("Trombone".to_owned()),
            membership_number: None,
            image: None,
            must_change_password: false,
            created_at: OffsetDateTime::now_utc(),
        };

        assert!(user.verify_password("trombone4ever"));
        assert!(!user.verify_password("trombone4never"));
    }
}
