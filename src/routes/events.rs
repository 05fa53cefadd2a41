use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{Permission, Session};
use crate::email;
use crate::email::event::{EventCreatedEmail, RegistrationClosedEmail};
use crate::error::ApiResult;
use crate::models::attendance::{
    Attendance, AttendanceWithUser, EventStats, HistoryEntry, NonResponder,
};
use crate::models::event::{Event, EventUpdate, NewEvent};
use crate::models::user::User;
use crate::state::AppState;

pub async fn all(
    Session(_claims): Session,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(Event::all(&state.pool).await?))
}

pub async fn create(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
    Json(new_event): Json<NewEvent>,
) -> ApiResult<Json<Event>> {
    claims.ensure(Permission::MANAGE_EVENTS)?;

    let event = Event::create(new_event, &state.pool).await?;
    tracing::info!(event = %event.title, "created event");

    let recipients = User::email_addresses(&state.pool).await?;
    email::dispatch(
        EventCreatedEmail::for_event(&event, &state.app_url),
        recipients,
    );

    Ok(Json(event))
}

#[derive(Serialize)]
pub struct EventDetail {
    pub event: Event,
    pub attendance: Vec<AttendanceWithUser>,
    pub history: Vec<HistoryEntry>,
    pub non_responders: Vec<NonResponder>,
    pub stats: EventStats,
}

pub async fn detail(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<EventDetail>> {
    claims.ensure(Permission::MANAGE_EVENTS)?;

    let event = Event::with_id(id, &state.pool).await?;
    let attendance = Attendance::for_event(id, &state.pool).await?;
    let history = Attendance::history_for_event(id, &state.pool).await?;
    let non_responders = Attendance::non_responders(id, &state.pool).await?;

    let statuses: Vec<_> = attendance.iter().map(|row| row.status).collect();
    let stats = EventStats::tally(&statuses, User::count(&state.pool).await?);

    Ok(Json(EventDetail {
        event,
        attendance,
        history,
        non_responders,
        stats,
    }))
}

pub async fn update(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Json(update): Json<EventUpdate>,
) -> ApiResult<Json<Event>> {
    claims.ensure(Permission::MANAGE_EVENTS)?;

    let before = Event::with_id(id, &state.pool).await?;
    let event = Event::update(id, &update, &state.pool).await?;

    // Broadcast only on the open -> closed transition; re-opening is silent
    if event.is_closed && !before.is_closed {
        tracing::info!(event = %event.title, "closed registration");
        let recipients = User::email_addresses(&state.pool).await?;
        email::dispatch(
            RegistrationClosedEmail::for_event(&event, &state.app_url),
            recipients,
        );
    }

    Ok(Json(event))
}

pub async fn remove(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
) -> ApiResult<StatusCode> {
    claims.ensure(Permission::MANAGE_EVENTS)?;

    Event::delete(id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT)
}
