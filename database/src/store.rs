use crate::{Event, EventChanges, NewEvent, Result, User, UserOverview};
use async_trait::async_trait;
use sqlx::{query, PgPool};
use std::sync::Arc;
use tracing::instrument;

/// A shared handle to a store
pub type SharedStore = Arc<dyn Store>;

/// The operations the API performs against persisted users and events
///
/// Every mutation is a single atomic operation; uniqueness and referential
/// integrity are enforced by the store and reported through [`crate::Error`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Get all the users
    async fn users(&self) -> Result<Vec<User>>;

    /// Get a user by their name
    async fn user(&self, name: &str) -> Result<Option<User>>;

    /// Find the names of users containing the fragment, ignoring case
    ///
    /// `%`, `_` and `\` in the fragment match literally rather than acting as wildcards.
    async fn search_users(&self, fragment: Option<&str>) -> Result<Vec<String>>;

    /// Get all the users along with the number of events they host
    async fn user_overviews(&self) -> Result<Vec<UserOverview>>;

    /// Get a user along with the number of events they host
    async fn user_overview(&self, name: &str) -> Result<Option<UserOverview>>;

    /// Create a new user
    async fn create_user(&self, name: &str) -> Result<User>;

    /// Rename a user, returning nothing if they do not exist
    async fn rename_user(&self, name: &str, new_name: &str) -> Result<Option<User>>;

    /// Delete a user, returning nothing if they do not exist
    async fn delete_user(&self, name: &str) -> Result<Option<User>>;

    /// Get all the events
    async fn events(&self) -> Result<Vec<Event>>;

    /// Get an event by its name
    async fn event(&self, name: &str) -> Result<Option<Event>>;

    /// Create a new event, creating the host if needed
    async fn create_event(&self, event: &NewEvent) -> Result<Event>;

    /// Update an event, returning nothing if it does not exist
    async fn update_event(&self, name: &str, changes: &EventChanges) -> Result<Option<Event>>;

    /// Delete an event, returning nothing if it does not exist
    async fn delete_event(&self, name: &str) -> Result<Option<Event>>;

    /// Replace every user and event with the given events
    async fn replace_all(&self, events: &[NewEvent]) -> Result<Vec<Event>>;
}

#[async_trait]
impl Store for PgPool {
    #[instrument(name = "PgPool::ping", skip_all)]
    async fn ping(&self) -> Result<()> {
        query("SELECT 1").execute(self).await?;
        Ok(())
    }

    async fn users(&self) -> Result<Vec<User>> {
        User::all(self).await
    }

    async fn user(&self, name: &str) -> Result<Option<User>> {
        User::find(name, self).await
    }

    async fn search_users(&self, fragment: Option<&str>) -> Result<Vec<String>> {
        User::search(fragment, self).await
    }

    async fn user_overviews(&self) -> Result<Vec<UserOverview>> {
        User::overview(self).await
    }

    async fn user_overview(&self, name: &str) -> Result<Option<UserOverview>> {
        User::find_overview(name, self).await
    }

    async fn create_user(&self, name: &str) -> Result<User> {
        User::create(name, self).await
    }

    async fn rename_user(&self, name: &str, new_name: &str) -> Result<Option<User>> {
        User::rename(name, new_name, self).await
    }

    async fn delete_user(&self, name: &str) -> Result<Option<User>> {
        User::delete(name, self).await
    }

    async fn events(&self) -> Result<Vec<Event>> {
        Event::all(self).await
    }

    async fn event(&self, name: &str) -> Result<Option<Event>> {
        Event::find(name, self).await
    }

    async fn create_event(&self, event: &NewEvent) -> Result<Event> {
        Event::create(event, self).await
    }

    async fn update_event(&self, name: &str, changes: &EventChanges) -> Result<Option<Event>> {
        Event::update(name, changes, self).await
    }

    async fn delete_event(&self, name: &str) -> Result<Option<Event>> {
        Event::delete(name, self).await
    }

    #[instrument(name = "PgPool::replace_all", skip_all, fields(count = events.len()))]
    async fn replace_all(&self, events: &[NewEvent]) -> Result<Vec<Event>> {
        let mut txn = self.begin().await?;

        Event::delete_everything(&mut *txn).await?;

        let mut created = Vec::with_capacity(events.len());
        for event in events {
            created.push(Event::create(event, &mut *txn).await?);
        }

        txn.commit().await?;

        Ok(created)
    }
}
