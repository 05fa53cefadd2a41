use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{Permission, Session};
use crate::error::ApiResult;
use crate::models::attendance::{Attendance, AttendanceStatus, EventWithUserStatus, OverviewRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitAttendance {
    pub event_id: Uuid,
    #[serde(default)]
    pub status: String,
}

pub async fn submit(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
    Json(submission): Json<SubmitAttendance>,
) -> ApiResult<Json<Attendance>> {
    let status = AttendanceStatus::parse(&submission.status)?;
    let attendance =
        Attendance::submit(claims.sub, submission.event_id, status, &state.pool).await?;

    Ok(Json(attendance))
}

/// Upcoming events with the caller's own response attached.
pub async fn upcoming_for_self(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Vec<EventWithUserStatus>>> {
    Ok(Json(
        Attendance::upcoming_with_status(claims.sub, &state.pool).await?,
    ))
}

pub async fn overview(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Vec<OverviewRow>>> {
    claims.ensure(Permission::VIEW_ATTENDANCE)?;

    Ok(Json(Attendance::overview(&state.pool).await?))
}
