use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::{AnySession, Claims, SESSION_COOKIE};
use crate::error::{ApiError, ApiResult};
use crate::models::role::Role;
use crate::models::user::{User, UserResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Unknown emails and wrong passwords get the same answer, so the login form
/// can't be used to probe for accounts.
pub async fn login(
    Extension(state): Extension<AppState>,
    Json(credentials): Json<LoginRequest>,
) -> ApiResult<Response> {
    let user = User::with_email_opt(&credentials.email, &state.pool)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if !user.verify_password(&credentials.password) {
        return Err(ApiError::Unauthorized);
    }

    let roles = Role::for_user(user.id, &state.pool).await?;
    let claims = Claims::for_user(&user, &roles);
    let token = state.sessions.issue(&claims)?;

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token
    );
    let mut response = Json(LoginResponse {
        token: token.clone(),
        user: user.into_response(roles),
    })
    .into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|err| anyhow::anyhow!("Invalid session cookie: {}", err))?,
    );

    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// The one route reachable while `must_change_password` is still set.
pub async fn change_password(
    AnySession(claims): AnySession,
    Extension(state): Extension<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    if body.password.len() < 6 {
        return Err(ApiError::BadRequest(
            "password must be at least 6 characters".to_owned(),
        ));
    }

    User::change_password(claims.sub, &body.password, &state.pool).await?;

    Ok(Json(json!({ "success": true })))
}
