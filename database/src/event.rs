use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{query, query_as, Executor, FromRow};
use tracing::instrument;
use uuid::Uuid;

/// An event hosted by a user
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Event {
    /// A unique ID
    pub id: Uuid,
    /// The unique display name
    pub name: String,
    /// Where the event takes place
    pub address: Option<String>,
    /// When the event takes place
    pub schedule: Option<DateTime<Utc>>,
    /// The user putting on the event
    pub host: Option<Host>,
    /// When the event was first created
    pub created_at: DateTime<Utc>,
}

/// A reference to the user hosting an event
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Host {
    pub id: Uuid,
    pub name: String,
}

/// The fields required to create an event
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub address: Option<String>,
    /// An RFC 3339 timestamp, validated by the store
    pub schedule: Option<String>,
    /// The name of the host, who is created if they do not exist yet
    pub host_name: Option<String>,
}

/// The changes to apply to an existing event
///
/// Fields left as `None` keep their current value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EventChanges {
    pub new_name: String,
    pub address: Option<String>,
    /// An RFC 3339 timestamp, validated by the store
    pub schedule: Option<String>,
    /// The name of the new host, who is created if they do not exist yet
    pub host_name: Option<String>,
}

/// An event joined with its host, as returned from the database
#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    name: String,
    address: Option<String>,
    schedule: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    host_id: Option<Uuid>,
    host_name: Option<String>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        let host = match (row.host_id, row.host_name) {
            (Some(id), Some(name)) => Some(Host { id, name }),
            _ => None,
        };

        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            schedule: row.schedule,
            host,
            created_at: row.created_at,
        }
    }
}

/// Parse a schedule timestamp, which must carry an explicit UTC offset
///
/// ```
/// let at = database::parse_schedule("2010-12-27T23:59:59-07:00").unwrap();
/// assert_eq!(at.to_rfc3339(), "2010-12-28T06:59:59+00:00");
/// ```
pub fn parse_schedule(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|error| Error::InvalidArgument(format!("invalid schedule {raw:?}: {error}")))
}

/// Parse an optional schedule
fn parse_optional_schedule(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(parse_schedule).transpose()
}

impl Event {
    /// Get all the events
    #[instrument(name = "Event::all", skip_all)]
    pub async fn all<'c, 'e, E>(db: E) -> Result<Vec<Event>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let events = query_as::<_, EventRow>(
            r#"
            SELECT events.id, events.name, events.address, events.schedule, events.created_at,
                   users.id AS host_id, users.name AS host_name
            FROM events
            LEFT JOIN users ON users.id = events.host_id
            ORDER BY events.name
            "#,
        )
        .fetch_all(db)
        .await?;

        Ok(events.into_iter().map(Event::from).collect())
    }

    /// Get an event by its name
    #[instrument(name = "Event::find", skip(db))]
    pub async fn find<'c, 'e, E>(name: &str, db: E) -> Result<Option<Event>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let event = query_as::<_, EventRow>(
            r#"
            SELECT events.id, events.name, events.address, events.schedule, events.created_at,
                   users.id AS host_id, users.name AS host_name
            FROM events
            LEFT JOIN users ON users.id = events.host_id
            WHERE events.name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(db)
        .await?;

        Ok(event.map(Event::from))
    }

    /// Create a new event, creating its host if they do not exist yet
    ///
    /// The host is upserted in the same statement so a failed insert never
    /// leaves a stray user behind.
    #[instrument(name = "Event::create", skip_all, fields(name = %event.name))]
    pub async fn create<'c, 'e, E>(event: &NewEvent, db: E) -> Result<Event>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let schedule = parse_optional_schedule(event.schedule.as_deref())?;

        let event = query_as::<_, EventRow>(
            r#"
            WITH host AS (
                INSERT INTO users (name)
                SELECT $4::varchar WHERE $4::varchar IS NOT NULL
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, name
            ), inserted AS (
                INSERT INTO events (name, address, schedule, host_id)
                VALUES ($1, $2, $3, (SELECT id FROM host))
                RETURNING *
            )
            SELECT inserted.id, inserted.name, inserted.address, inserted.schedule,
                   inserted.created_at, host.id AS host_id, host.name AS host_name
            FROM inserted
            LEFT JOIN host ON host.id = inserted.host_id
            "#,
        )
        .bind(&event.name)
        .bind(event.address.as_deref())
        .bind(schedule)
        .bind(event.host_name.as_deref())
        .fetch_one(db)
        .await?;

        Ok(event.into())
    }

    /// Apply changes to an event, returning nothing if the event does not exist
    #[instrument(name = "Event::update", skip(changes, db))]
    pub async fn update<'c, 'e, E>(
        name: &str,
        changes: &EventChanges,
        db: E,
    ) -> Result<Option<Event>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let schedule = parse_optional_schedule(changes.schedule.as_deref())?;

        // the host is only written when the event exists; rows written by the `host`
        // CTE are invisible to the plain `users` join, so the host is resolved from both
        let event = query_as::<_, EventRow>(
            r#"
            WITH host AS (
                INSERT INTO users (name)
                SELECT $5::varchar
                WHERE $5::varchar IS NOT NULL
                  AND EXISTS (SELECT 1 FROM events WHERE name = $1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, name
            ), updated AS (
                UPDATE events SET
                    name = $2,
                    address = COALESCE($3, events.address),
                    schedule = COALESCE($4, events.schedule),
                    host_id = COALESCE((SELECT id FROM host), events.host_id)
                WHERE events.name = $1
                RETURNING *
            )
            SELECT updated.id, updated.name, updated.address, updated.schedule,
                   updated.created_at,
                   COALESCE(host.id, users.id) AS host_id,
                   COALESCE(host.name, users.name) AS host_name
            FROM updated
            LEFT JOIN host ON host.id = updated.host_id
            LEFT JOIN users ON users.id = updated.host_id
            "#,
        )
        .bind(name)
        .bind(&changes.new_name)
        .bind(changes.address.as_deref())
        .bind(schedule)
        .bind(changes.host_name.as_deref())
        .fetch_optional(db)
        .await?;

        Ok(event.map(Event::from))
    }

    /// Delete an event by its name, returning the deleted event if it existed
    #[instrument(name = "Event::delete", skip(db))]
    pub async fn delete<'c, 'e, E>(name: &str, db: E) -> Result<Option<Event>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let event = query_as::<_, EventRow>(
            r#"
            WITH deleted AS (
                DELETE FROM events WHERE name = $1 RETURNING *
            )
            SELECT deleted.id, deleted.name, deleted.address, deleted.schedule,
                   deleted.created_at, users.id AS host_id, users.name AS host_name
            FROM deleted
            LEFT JOIN users ON users.id = deleted.host_id
            "#,
        )
        .bind(name)
        .fetch_optional(db)
        .await?;

        Ok(event.map(Event::from))
    }

    /// Delete every event and user
    #[instrument(name = "Event::delete_everything", skip_all)]
    pub async fn delete_everything<'c, 'e, E>(db: E) -> Result<()>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        query("TRUNCATE events, users").execute(db).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_schedule, Event, EventRow, Host};
    use crate::Error;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn schedule_with_offset_is_normalized_to_utc() {
        let at = parse_schedule("2010-12-27T23:59:59-07:00").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2010, 12, 28, 6, 59, 59).unwrap());
    }

    #[test]
    fn schedule_keeps_fractional_seconds() {
        let at = parse_schedule("2030-01-01T00:00:00.123456Z").unwrap();
        assert_eq!(at.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn schedule_without_offset_is_rejected() {
        let error = parse_schedule("2010-12-27T23:59:59").unwrap_err();
        assert!(matches!(error, Error::InvalidArgument(_)));
    }

    #[test]
    fn garbage_schedule_is_rejected() {
        let error = parse_schedule("not-a-date").unwrap_err();
        assert!(matches!(error, Error::InvalidArgument(_)));
    }

    #[test]
    fn row_without_host_has_no_host() {
        let row = EventRow {
            id: Uuid::new_v4(),
            name: String::from("launch party"),
            address: None,
            schedule: None,
            created_at: Utc::now(),
            host_id: None,
            host_name: None,
        };

        let event = Event::from(row);
        assert_eq!(event.host, None);
    }

    #[test]
    fn row_with_host_is_nested() {
        let host_id = Uuid::new_v4();
        let row = EventRow {
            id: Uuid::new_v4(),
            name: String::from("launch party"),
            address: Some(String::from("1 Main St")),
            schedule: None,
            created_at: Utc::now(),
            host_id: Some(host_id),
            host_name: Some(String::from("alice")),
        };

        let event = Event::from(row);
        assert_eq!(
            event.host,
            Some(Host {
                id: host_id,
                name: String::from("alice")
            })
        );
    }
}
