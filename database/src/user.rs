use crate::Result;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use serde::Serialize;
use sqlx::{query_as, query_scalar, Executor, FromRow};
use tracing::instrument;
use uuid::Uuid;

/// A user that can host events
#[derive(Clone, Debug, Eq, FromRow, PartialEq, Serialize)]
pub struct User {
    /// A unique ID
    pub id: Uuid,
    /// The unique display name
    pub name: String,
    /// When the user was first created
    pub created_at: DateTime<Utc>,
}

/// A user along with how many events they host
#[derive(Clone, Debug, Eq, FromRow, PartialEq, Serialize)]
pub struct UserOverview {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// The number of events hosted by the user
    pub event_count: i64,
}

impl User {
    /// Get all the users
    #[instrument(name = "User::all", skip_all)]
    pub async fn all<'c, 'e, E>(db: E) -> Result<Vec<User>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let users = query_as::<_, User>("SELECT id, name, created_at FROM users ORDER BY name")
            .fetch_all(db)
            .await?;

        Ok(users)
    }

    /// Get a user by their name
    #[instrument(name = "User::find", skip(db))]
    pub async fn find<'c, 'e, E>(name: &str, db: E) -> Result<Option<User>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let user = query_as::<_, User>("SELECT id, name, created_at FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(db)
            .await?;

        Ok(user)
    }

    /// Find the names of all users containing the fragment, ignoring case
    #[instrument(name = "User::search", skip(db))]
    pub async fn search<'c, 'e, E>(fragment: Option<&str>, db: E) -> Result<Vec<String>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let pattern = match fragment {
            Some(fragment) => format!("%{}%", escape_like(fragment)),
            None => String::from("%"),
        };

        let names: Vec<String> = query_scalar::<_, String>(
            r"SELECT name FROM users WHERE name ILIKE $1 ESCAPE '\' ORDER BY name",
        )
        .bind(pattern)
        .fetch(db)
        .try_collect()
        .await?;

        Ok(names)
    }

    /// Get all the users along with the number of events they host
    #[instrument(name = "User::overview", skip_all)]
    pub async fn overview<'c, 'e, E>(db: E) -> Result<Vec<UserOverview>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let users = query_as::<_, UserOverview>(
            r#"
            SELECT users.id, users.name, users.created_at, count(events.id) AS event_count
            FROM users
            LEFT JOIN events ON events.host_id = users.id
            GROUP BY users.id
            ORDER BY users.name
            "#,
        )
        .fetch_all(db)
        .await?;

        Ok(users)
    }

    /// Get a user by their name, along with the number of events they host
    #[instrument(name = "User::find_overview", skip(db))]
    pub async fn find_overview<'c, 'e, E>(name: &str, db: E) -> Result<Option<UserOverview>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let user = query_as::<_, UserOverview>(
            r#"
            SELECT users.id, users.name, users.created_at, count(events.id) AS event_count
            FROM users
            LEFT JOIN events ON events.host_id = users.id
            WHERE users.name = $1
            GROUP BY users.id
            "#,
        )
        .bind(name)
        .fetch_optional(db)
        .await?;

        Ok(user)
    }

    /// Create a new user
    #[instrument(name = "User::create", skip(db))]
    pub async fn create<'c, 'e, E>(name: &str, db: E) -> Result<User>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let user = query_as::<_, User>(
            "INSERT INTO users (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(db)
        .await?;

        Ok(user)
    }

    /// Rename a user, returning nothing if the user does not exist
    #[instrument(name = "User::rename", skip(db))]
    pub async fn rename<'c, 'e, E>(name: &str, new_name: &str, db: E) -> Result<Option<User>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let user = query_as::<_, User>(
            "UPDATE users SET name = $2 WHERE name = $1 RETURNING id, name, created_at",
        )
        .bind(name)
        .bind(new_name)
        .fetch_optional(db)
        .await?;

        Ok(user)
    }

    /// Delete a user by their name, returning the deleted user if it existed
    #[instrument(name = "User::delete", skip(db))]
    pub async fn delete<'c, 'e, E>(name: &str, db: E) -> Result<Option<User>>
    where
        'c: 'e,
        E: 'e + Executor<'c, Database = sqlx::Postgres>,
    {
        let user = query_as::<_, User>(
            "DELETE FROM users WHERE name = $1 RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_optional(db)
        .await?;

        Ok(user)
    }
}

/// Escape the wildcards of a `LIKE` pattern so the fragment matches literally
pub(crate) fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn plain_fragments_are_unchanged() {
        assert_eq!(escape_like("alice"), "alice");
    }

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }
}
