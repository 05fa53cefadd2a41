use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "attendance_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Absent => "ABSENT",
        }
    }

    /// Parses a submitted status, rejecting anything but the two valid values.
    pub fn parse(status: &str) -> ApiResult<Self> {
        match status {
            "PRESENT" => Ok(Self::Present),
            "ABSENT" => Ok(Self::Absent),
            other => Err(ApiError::BadRequest(format!(
                "invalid attendance status {:?}",
                other
            ))),
        }
    }
}

/// A member's current stated status for one event. Upserted, never duplicated;
/// every change also lands in `attendance_history`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Attendance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub status: AttendanceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// An attendance row joined with who it belongs to, for the event detail page.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct AttendanceWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: AttendanceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub user_name: String,
    pub user_email: String,
    pub user_instrument: Option<String>,
}

/// One entry of the append-only audit log, joined with who made the change.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub status: AttendanceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_name: String,
    pub user_email: String,
}

/// The full current ledger, for the admin attendance overview.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct OverviewRow {
    pub id: Uuid,
    pub status: AttendanceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub user_name: String,
    pub user_email: String,
    pub event_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
}

/// An upcoming event paired with the caller's own response, if any.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct EventWithUserStatus {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub location: Option<String>,
    pub description: Option<String>,
    pub is_closed: bool,
    pub user_status: Option<AttendanceStatus>,
}

#[derive(Debug, Serialize)]
pub struct EventStats {
    pub present_count: i64,
    pub absent_count: i64,
    pub no_response_count: i64,
}

impl EventStats {
    /// No-response is computed, not stored: everyone without a ledger row.
    pub fn tally(statuses: &[AttendanceStatus], total_users: i64) -> Self {
        let present_count = statuses
            .iter()
            .filter(|status| **status == AttendanceStatus::Present)
            .count() as i64;
        let absent_count = statuses.len() as i64 - present_count;

        Self {
            present_count,
            absent_count,
            no_response_count: (total_users - statuses.len() as i64).max(0),
        }
    }
}

fn ensure_open(event: &Event) -> ApiResult<()> {
    if event.is_closed {
        Err(ApiError::RegistrationClosed)
    } else {
        Ok(())
    }
}

impl Attendance {
    /// Records the member's current status for an open event. The upsert and
    /// the history append land in one transaction so the ledger and its audit
    /// log can never disagree.
    pub async fn submit(
        user_id: Uuid,
        event_id: Uuid,
        status: AttendanceStatus,
        pool: &PgPool,
    ) -> ApiResult<Self> {
        let event = Event::with_id(event_id, pool).await?;
        ensure_open(&event)?;

        let mut tx = pool.begin().await?;
        let attendance = sqlx::query_as::<_, Self>(
            "INSERT INTO attendance (id, user_id, event_id, status, updated_at)
             VALUES ($1, $2, $3, $4, now())
             ON CONFLICT (user_id, event_id)
             DO UPDATE SET status = EXCLUDED.status, updated_at = now()
             RETURNING id, user_id, event_id, status, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_id)
        .bind(status)
        .fetch_one(&mut tx)
        .await?;

        sqlx::query(
            "INSERT INTO attendance_history (id, user_id, event_id, status)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_id)
        .bind(status)
        .execute(&mut tx)
        .await?;
        tx.commit().await?;

        Ok(attendance)
    }

    pub async fn for_event(event_id: Uuid, pool: &PgPool) -> ApiResult<Vec<AttendanceWithUser>> {
        sqlx::query_as::<_, AttendanceWithUser>(
            "SELECT a.id, a.user_id, a.status, a.updated_at,
                    u.name AS user_name, u.email AS user_email, u.instrument AS user_instrument
             FROM attendance a
             INNER JOIN users u ON u.id = a.user_id
             WHERE a.event_id = $1
             ORDER BY u.name",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn history_for_event(event_id: Uuid, pool: &PgPool) -> ApiResult<Vec<HistoryEntry>> {
        sqlx::query_as::<_, HistoryEntry>(
            "SELECT h.id, h.status, h.created_at, u.name AS user_name, u.email AS user_email
             FROM attendance_history h
             INNER JOIN users u ON u.id = h.user_id
             WHERE h.event_id = $1
             ORDER BY h.created_at DESC",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Members with no ledger row for the event, i.e. the no-response set.
    pub async fn non_responders(event_id: Uuid, pool: &PgPool) -> ApiResult<Vec<NonResponder>> {
        sqlx::query_as::<_, NonResponder>(
            "SELECT id, name, email FROM users
             WHERE id NOT IN (SELECT user_id FROM attendance WHERE event_id = $1)
             ORDER BY name",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn overview(pool: &PgPool) -> ApiResult<Vec<OverviewRow>> {
        sqlx::query_as::<_, OverviewRow>(
            "SELECT a.id, a.status, a.updated_at,
                    u.name AS user_name, u.email AS user_email,
                    e.title AS event_title, e.date AS event_date
             FROM attendance a
             INNER JOIN users u ON u.id = a.user_id
             INNER JOIN events e ON e.id = a.event_id
             ORDER BY a.updated_at DESC",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn upcoming_with_status(
        user_id: Uuid,
        pool: &PgPool,
    ) -> ApiResult<Vec<EventWithUserStatus>> {
        sqlx::query_as::<_, EventWithUserStatus>(
            "SELECT e.id, e.title, e.date, e.location, e.description, e.is_closed,
                    a.status AS user_status
             FROM events e
             LEFT JOIN attendance a ON a.event_id = e.id AND a.user_id = $1
             WHERE e.date >= now()
             ORDER BY e.date",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Every event paired with the member's status, newest event first.
    pub async fn history_for_user(
        user_id: Uuid,
        pool: &PgPool,
    ) -> ApiResult<Vec<UserEventStatus>> {
        sqlx::query_as::<_, UserEventStatus>(
            "SELECT e.id AS event_id, e.title, e.date, e.location, a.status
             FROM events e
             LEFT JOIN attendance a ON a.event_id = e.id AND a.user_id = $1
             ORDER BY e.date DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct NonResponder {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserEventStatus {
    pub event_id: Uuid,
    pub title: String,
    pub date: OffsetDateTime,
    pub location: Option<String>,
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Serialize)]
pub struct ParticipationStats {
    pub total_events: i64,
    pub present_count: i64,
    pub absent_count: i64,
    pub no_response_count: i64,
    /// Percentage of events attended, rounded; 0 when there are no events
    pub participation_rate: i64,
}

impl ParticipationStats {
    pub fn from_history(statuses: &[Option<AttendanceStatus>]) -> Self {
        let total_events = statuses.len() as i64;
        let present_count = statuses
            .iter()
            .filter(|status| **status == Some(AttendanceStatus::Present))
            .count() as i64;
        let absent_count = statuses
            .iter()
            .filter(|status| **status == Some(AttendanceStatus::Absent))
            .count() as i64;

        Self {
            total_events,
            present_count,
            absent_count,
            no_response_count: total_events - present_count - absent_count,
            participation_rate: if total_events > 0 {
                (present_count as f64 / total_events as f64 * 100.0).round() as i64
            } else {
                0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn event(is_closed: bool) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Concert".to_owned(),
            date: OffsetDateTime::now_utc(),
            location: Some("Town Hall".to_owned()),
            description: None,
            is_closed,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn closed_events_reject_submissions() {
        assert!(matches!(
            ensure_open(&event(true)),
            Err(ApiError::RegistrationClosed)
        ));
        assert!(ensure_open(&event(false)).is_ok());
    }

    #[test]
    fn stats_partition_the_whole_membership() {
        let statuses = [
            AttendanceStatus::Present,
            AttendanceStatus::Absent,
            AttendanceStatus::Present,
        ];
        let total_users = 10;

        let stats = EventStats::tally(&statuses, total_users);
        assert_eq!(stats.present_count, 2);
        assert_eq!(stats.absent_count, 1);
        assert_eq!(stats.no_response_count, 7);
        assert_eq!(
            stats.present_count + stats.absent_count + stats.no_response_count,
            total_users
        );
    }

    #[test]
    fn stats_for_an_unanswered_event() {
        let stats = EventStats::tally(&[], 4);
        assert_eq!(stats.present_count, 0);
        assert_eq!(stats.absent_count, 0);
        assert_eq!(stats.no_response_count, 4);
    }

    #[test]
    fn participation_rate_rounds_and_handles_empty_history() {
        let history = [
            Some(AttendanceStatus::Present),
            Some(AttendanceStatus::Present),
            Some(AttendanceStatus::Absent),
            None,
        ];
        let stats = ParticipationStats::from_history(&history);
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.present_count, 2);
        assert_eq!(stats.absent_count, 1);
        assert_eq!(stats.no_response_count, 1);
        assert_eq!(stats.participation_rate, 50);

        assert_eq!(ParticipationStats::from_history(&[]).participation_rate, 0);
    }

    #[test]
    fn only_the_two_valid_statuses_parse() {
        assert_eq!(
            AttendanceStatus::parse("PRESENT").unwrap(),
            AttendanceStatus::Present
        );
        assert_eq!(
            AttendanceStatus::parse("ABSENT").unwrap(),
            AttendanceStatus::Absent
        );
        assert!(matches!(
            AttendanceStatus::parse("MAYBE"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(AttendanceStatus::parse("present").is_err());
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Present).unwrap(),
            "\"PRESENT\""
        );
        assert_eq!(
            serde_json::from_str::<AttendanceStatus>("\"ABSENT\"").unwrap(),
            AttendanceStatus::Absent
        );
    }
}
