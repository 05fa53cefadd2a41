use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{Permission, Session};
use crate::error::ApiResult;
use crate::models::attendance::{Attendance, ParticipationStats};
use crate::models::clothing::ClothingItem;
use crate::models::role::Role;
use crate::models::user::{NewUser, User, UserResponse, UserUpdate};
use crate::state::AppState;

pub async fn all(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    claims.ensure(Permission::MANAGE_USERS)?;

    let users = User::all(&state.pool).await?;
    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        let roles = Role::for_user(user.id, &state.pool).await?;
        responses.push(user.into_response(roles));
    }

    Ok(Json(responses))
}

pub async fn create(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
    Json(new_user): Json<NewUser>,
) -> ApiResult<Json<UserResponse>> {
    claims.ensure(Permission::MANAGE_USERS)?;

    let user = User::create(new_user, &state.pool).await?;
    let roles = Role::for_user(user.id, &state.pool).await?;

    Ok(Json(user.into_response(roles)))
}

#[derive(Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: UserResponse,
    pub clothing_items: Vec<ClothingItem>,
}

/// Members can look at their own profile; seeing anyone else's takes the
/// user-management permission.
pub async fn detail(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<UserDetail>> {
    if claims.sub != id {
        claims.ensure(Permission::MANAGE_USERS)?;
    }

    let user = User::with_id(id, &state.pool).await?;
    let roles = Role::for_user(id, &state.pool).await?;
    let clothing_items = ClothingItem::for_user(id, &state.pool).await?;

    Ok(Json(UserDetail {
        user: user.into_response(roles),
        clothing_items,
    }))
}

pub async fn update(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Json(user_update): Json<UserUpdate>,
) -> ApiResult<Json<UserResponse>> {
    claims.ensure(Permission::MANAGE_USERS)?;

    let user = User::update(id, user_update, &state.pool).await?;
    let roles = Role::for_user(id, &state.pool).await?;

    Ok(Json(user.into_response(roles)))
}

pub async fn remove(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
) -> ApiResult<StatusCode> {
    claims.ensure(Permission::MANAGE_USERS)?;

    User::delete(id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct HistoryRow {
    pub event_id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub location: Option<String>,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct UserHistory {
    pub user: UserResponse,
    pub history: Vec<HistoryRow>,
    pub stats: ParticipationStats,
}

pub async fn history(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<UserHistory>> {
    claims.ensure(Permission::MANAGE_USERS)?;

    let user = User::with_id(id, &state.pool).await?;
    let roles = Role::for_user(id, &state.pool).await?;
    let rows = Attendance::history_for_user(id, &state.pool).await?;

    let statuses: Vec<_> = rows.iter().map(|row| row.status).collect();
    let stats = ParticipationStats::from_history(&statuses);

    let history = rows
        .into_iter()
        .map(|row| HistoryRow {
            event_id: row.event_id,
            title: row.title,
            date: row.date,
            location: row.location,
            status: row
                .status
                .map(|status| status.as_str())
                .unwrap_or("NO_RESPONSE"),
        })
        .collect();

    Ok(Json(UserHistory {
        user: user.into_response(roles),
        history,
        stats,
    }))
}
