use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{Permission, Session};
use crate::error::ApiResult;
use crate::models::profile_request::{
    NewProfileChangeRequest, PendingRequest, ProfileChangeRequest, RequestAction,
};
use crate::state::AppState;

pub async fn submit(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
    Json(new_request): Json<NewProfileChangeRequest>,
) -> ApiResult<Json<ProfileChangeRequest>> {
    let request = ProfileChangeRequest::submit(claims.sub, new_request, &state.pool).await?;

    Ok(Json(request))
}

pub async fn pending(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Vec<PendingRequest>>> {
    claims.ensure(Permission::MANAGE_USERS)?;

    Ok(Json(ProfileChangeRequest::all_pending(&state.pool).await?))
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub request_id: Uuid,
    pub action: RequestAction,
}

pub async fn decide(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
    Json(decision): Json<DecideRequest>,
) -> ApiResult<Json<Value>> {
    claims.ensure(Permission::MANAGE_USERS)?;

    ProfileChangeRequest::decide(decision.request_id, decision.action, &state.pool).await?;

    let message = match decision.action {
        RequestAction::Approve => "request approved and profile updated",
        RequestAction::Reject => "request rejected",
    };

    Ok(Json(json!({ "message": message })))
}
