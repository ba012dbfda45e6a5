use crate::{
    event::parse_schedule, Error, Event, EventChanges, Host, NewEvent, Result, Store, User,
    UserOverview,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A store held entirely in memory, enforcing the same constraints as the database
///
/// Intended for tests and local experimentation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    events: Vec<StoredEvent>,
}

#[derive(Clone, Debug)]
struct StoredEvent {
    id: Uuid,
    name: String,
    address: Option<String>,
    schedule: Option<chrono::DateTime<Utc>>,
    host_id: Option<Uuid>,
    created_at: chrono::DateTime<Utc>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|user| user.name == name)
    }

    fn event_index(&self, name: &str) -> Option<usize> {
        self.events.iter().position(|event| event.name == name)
    }

    /// Find or create the user with the given name
    fn upsert_host(&mut self, name: &str) -> Uuid {
        if let Some(user) = self.user_by_name(name) {
            return user.id;
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        let id = user.id;
        self.users.push(user);
        id
    }

    fn hydrate(&self, event: &StoredEvent) -> Event {
        let host = event.host_id.and_then(|id| {
            self.users.iter().find(|user| user.id == id).map(|user| Host {
                id: user.id,
                name: user.name.clone(),
            })
        });

        Event {
            id: event.id,
            name: event.name.clone(),
            address: event.address.clone(),
            schedule: event.schedule,
            host,
            created_at: event.created_at,
        }
    }

    fn overview(&self, user: &User) -> UserOverview {
        let event_count = self
            .events
            .iter()
            .filter(|event| event.host_id == Some(user.id))
            .count();

        UserOverview {
            id: user.id,
            name: user.name.clone(),
            created_at: user.created_at,
            event_count: event_count as i64,
        }
    }

    fn create_event(&mut self, event: &NewEvent) -> Result<Event> {
        let schedule = event.schedule.as_deref().map(parse_schedule).transpose()?;
        if self.event_index(&event.name).is_some() {
            return Err(unique_violation("events_name_key"));
        }

        let host_id = event.host_name.as_deref().map(|name| self.upsert_host(name));
        let stored = StoredEvent {
            id: Uuid::new_v4(),
            name: event.name.clone(),
            address: event.address.clone(),
            schedule,
            host_id,
            created_at: Utc::now(),
        };
        let created = self.hydrate(&stored);
        self.events.push(stored);

        Ok(created)
    }
}

fn unique_violation(constraint: &str) -> Error {
    Error::UniqueViolation {
        constraint: Some(constraint.to_owned()),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn users(&self) -> Result<Vec<User>> {
        let state = self.state.lock().await;
        let mut users = state.users.clone();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn user(&self, name: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.user_by_name(name).cloned())
    }

    async fn search_users(&self, fragment: Option<&str>) -> Result<Vec<String>> {
        let fragment = fragment.unwrap_or_default().to_lowercase();

        let state = self.state.lock().await;
        let mut names = state
            .users
            .iter()
            .filter(|user| user.name.to_lowercase().contains(&fragment))
            .map(|user| user.name.clone())
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }

    async fn user_overviews(&self) -> Result<Vec<UserOverview>> {
        let state = self.state.lock().await;
        let mut overviews = state
            .users
            .iter()
            .map(|user| state.overview(user))
            .collect::<Vec<_>>();
        overviews.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(overviews)
    }

    async fn user_overview(&self, name: &str) -> Result<Option<UserOverview>> {
        let state = self.state.lock().await;
        Ok(state.user_by_name(name).map(|user| state.overview(user)))
    }

    async fn create_user(&self, name: &str) -> Result<User> {
        let mut state = self.state.lock().await;
        if state.user_by_name(name).is_some() {
            return Err(unique_violation("users_name_key"));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        state.users.push(user.clone());

        Ok(user)
    }

    async fn rename_user(&self, name: &str, new_name: &str) -> Result<Option<User>> {
        let mut state = self.state.lock().await;
        let Some(index) = state.users.iter().position(|user| user.name == name) else {
            return Ok(None);
        };

        if name != new_name && state.user_by_name(new_name).is_some() {
            return Err(unique_violation("users_name_key"));
        }

        let user = &mut state.users[index];
        user.name = new_name.to_owned();

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, name: &str) -> Result<Option<User>> {
        let mut state = self.state.lock().await;
        let Some(index) = state.users.iter().position(|user| user.name == name) else {
            return Ok(None);
        };

        let id = state.users[index].id;
        if state.events.iter().any(|event| event.host_id == Some(id)) {
            return Err(Error::ForeignKeyViolation {
                constraint: Some(String::from("events_host_id_fkey")),
            });
        }

        Ok(Some(state.users.remove(index)))
    }

    async fn events(&self) -> Result<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events = state
            .events
            .iter()
            .map(|event| state.hydrate(event))
            .collect::<Vec<_>>();
        events.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(events)
    }

    async fn event(&self, name: &str) -> Result<Option<Event>> {
        let state = self.state.lock().await;
        Ok(state
            .event_index(name)
            .map(|index| state.hydrate(&state.events[index])))
    }

    async fn create_event(&self, event: &NewEvent) -> Result<Event> {
        let mut state = self.state.lock().await;
        state.create_event(event)
    }

    async fn update_event(&self, name: &str, changes: &EventChanges) -> Result<Option<Event>> {
        let schedule = changes
            .schedule
            .as_deref()
            .map(parse_schedule)
            .transpose()?;

        let mut state = self.state.lock().await;
        let Some(index) = state.event_index(name) else {
            return Ok(None);
        };

        if name != changes.new_name && state.event_index(&changes.new_name).is_some() {
            return Err(unique_violation("events_name_key"));
        }

        let host_id = changes
            .host_name
            .as_deref()
            .map(|host_name| state.upsert_host(host_name));

        let event = &mut state.events[index];
        event.name = changes.new_name.clone();
        if let Some(address) = &changes.address {
            event.address = Some(address.clone());
        }
        if let Some(schedule) = schedule {
            event.schedule = Some(schedule);
        }
        if let Some(host_id) = host_id {
            event.host_id = Some(host_id);
        }

        let updated = state.events[index].clone();
        Ok(Some(state.hydrate(&updated)))
    }

    async fn delete_event(&self, name: &str) -> Result<Option<Event>> {
        let mut state = self.state.lock().await;
        let Some(index) = state.event_index(name) else {
            return Ok(None);
        };

        let deleted = state.hydrate(&state.events[index]);
        state.events.remove(index);

        Ok(Some(deleted))
    }

    async fn replace_all(&self, events: &[NewEvent]) -> Result<Vec<Event>> {
        let mut replacement = State::default();
        let created = events
            .iter()
            .map(|event| replacement.create_event(event))
            .collect::<Result<Vec<_>>>()?;

        *self.state.lock().await = replacement;

        Ok(created)
    }
}
