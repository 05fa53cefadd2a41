use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{Permission, Session};
use crate::error::ApiResult;
use crate::models::role::{Role, RoleResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewRole {
    #[serde(default)]
    pub name: String,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub permissions: Option<Vec<String>>,
}

pub async fn all(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    claims.ensure(Permission::MANAGE_ROLES)?;

    let roles = Role::all(&state.pool).await?;

    Ok(Json(roles.into_iter().map(Role::into_response).collect()))
}

pub async fn create(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
    Json(new_role): Json<NewRole>,
) -> ApiResult<Json<RoleResponse>> {
    claims.ensure(Permission::MANAGE_ROLES)?;

    let permissions = new_role.permissions.unwrap_or_default();
    let role = Role::create(&new_role.name, &permissions, &state.pool).await?;

    Ok(Json(role.into_response()))
}

pub async fn detail(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<RoleResponse>> {
    claims.ensure(Permission::MANAGE_ROLES)?;

    let role = Role::with_id(id, &state.pool).await?;

    Ok(Json(role.into_response()))
}

pub async fn update(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Json(role_update): Json<RoleUpdate>,
) -> ApiResult<Json<RoleResponse>> {
    claims.ensure(Permission::MANAGE_ROLES)?;

    let permissions = role_update.permissions.unwrap_or_default();
    let role = Role::update(
        id,
        role_update.name.as_deref(),
        &permissions,
        &state.pool,
    )
    .await?;

    Ok(Json(role.into_response()))
}

pub async fn remove(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
) -> ApiResult<StatusCode> {
    claims.ensure(Permission::MANAGE_ROLES)?;

    Role::delete(id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT)
}
