use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "request_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestAction {
    Approve,
    Reject,
}

/// A member's proposed edit to their own profile, waiting on an admin.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProfileChangeRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub new_name: Option<String>,
    pub new_email: Option<String>,
    pub new_instrument: Option<String>,
    pub new_image: Option<String>,
    pub status: RequestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct NewProfileChangeRequest {
    pub new_name: Option<String>,
    pub new_email: Option<String>,
    pub new_instrument: Option<String>,
    pub new_image: Option<String>,
}

/// A pending request joined with the current profile, for review.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct PendingRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub new_name: Option<String>,
    pub new_email: Option<String>,
    pub new_instrument: Option<String>,
    pub new_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_name: String,
    pub user_email: String,
    pub user_instrument: Option<String>,
    pub user_membership_number: Option<String>,
}

const REQUEST_COLUMNS: &str =
    "id, user_id, new_name, new_email, new_instrument, new_image, status, created_at";

/// A field counts as proposed only when it was submitted non-empty.
fn proposed(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

impl ProfileChangeRequest {
    pub async fn submit(
        user_id: Uuid,
        new_request: NewProfileChangeRequest,
        pool: &PgPool,
    ) -> ApiResult<Self> {
        if Self::pending_for_user(user_id, pool).await?.is_some() {
            return Err(ApiError::BadRequest(
                "a change request is already pending".to_owned(),
            ));
        }

        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO profile_change_requests
                 (id, user_id, new_name, new_email, new_instrument, new_image)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new_request.new_name)
        .bind(&new_request.new_email)
        .bind(&new_request.new_instrument)
        .bind(&new_request.new_image)
        .fetch_one(pool)
        .await
        .map_err(|err| match &err {
            // The partial unique index catches submissions that raced past the
            // check above
            sqlx::Error::Database(db_err)
                if db_err.constraint() == Some("one_pending_request_per_user") =>
            {
                ApiError::BadRequest("a change request is already pending".to_owned())
            }
            _ => err.into(),
        })
    }

    pub async fn with_id_opt(id: Uuid, pool: &PgPool) -> ApiResult<Option<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {} FROM profile_change_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn pending_for_user(user_id: Uuid, pool: &PgPool) -> ApiResult<Option<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {} FROM profile_change_requests WHERE user_id = $1 AND status = 'PENDING'",
            REQUEST_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn all_pending(pool: &PgPool) -> ApiResult<Vec<PendingRequest>> {
        sqlx::query_as::<_, PendingRequest>(
            "SELECT r.id, r.user_id, r.new_name, r.new_email, r.new_instrument, r.new_image,
                    r.created_at, u.name AS user_name, u.email AS user_email,
                    u.instrument AS user_instrument,
                    u.membership_number AS user_membership_number
             FROM profile_change_requests r
             INNER JOIN users u ON u.id = r.user_id
             WHERE r.status = 'PENDING'
             ORDER BY r.created_at",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Resolves a pending request. Approval applies exactly the proposed
    /// fields to the member and flips the status in one transaction; acting on
    /// an already-resolved request is an error, never a double-apply.
    pub async fn decide(id: Uuid, action: RequestAction, pool: &PgPool) -> ApiResult<()> {
        let request = Self::with_id_opt(id, pool)
            .await?
            .ok_or(ApiError::NotFound("change request"))?;
        if request.status != RequestStatus::Pending {
            return Err(ApiError::BadRequest(
                "change request is already resolved".to_owned(),
            ));
        }

        match action {
            RequestAction::Reject => {
                sqlx::query("UPDATE profile_change_requests SET status = 'REJECTED' WHERE id = $1")
                    .bind(id)
                    .execute(pool)
                    .await?;
            }
            RequestAction::Approve => {
                let mut tx = pool.begin().await?;
                sqlx::query(
                    "UPDATE users SET
                        name = COALESCE($2, name),
                        email = COALESCE($3, email),
                        instrument = COALESCE($4, instrument),
                        image = COALESCE($5, image)
                     WHERE id = $1",
                )
                .bind(request.user_id)
                .bind(proposed(&request.new_name))
                .bind(proposed(&request.new_email))
                .bind(proposed(&request.new_instrument))
                .bind(proposed(&request.new_image))
                .execute(&mut tx)
                .await?;

                sqlx::query(
                    "UPDATE profile_change_requests SET status = 'APPROVED'
                     WHERE id = $1 AND status = 'PENDING'",
                )
                .bind(id)
                .execute(&mut tx)
                .await?;
                tx.commit().await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_not_proposed() {
        assert_eq!(proposed(&None), None);
        assert_eq!(proposed(&Some(String::new())), None);
        assert_eq!(proposed(&Some("Flute".to_owned())), Some("Flute"));
    }

    #[test]
    fn actions_parse_from_uppercase() {
        assert_eq!(
            serde_json::from_str::<RequestAction>("\"APPROVE\"").unwrap(),
            RequestAction::Approve
        );
        assert_eq!(
            serde_json::from_str::<RequestAction>("\"REJECT\"").unwrap(),
            RequestAction::Reject
        );
        assert!(serde_json::from_str::<RequestAction>("\"approve\"").is_err());
    }

    #[test]
    fn statuses_serialize_uppercase() {
        assert_eq!(
            serde_json::to_string(&RequestStatus::Pending).unwrap(),
            "\"PENDING\""
        );
    }
}
