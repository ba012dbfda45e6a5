use super::{check_name, Error, Listing, NameFilter, NameParam, Params, Payload, Problem, Result};
use crate::Settings;
use axum::{extract::State, http::StatusCode, response::Json};
use database::{Error as StoreError, Event, EventChanges, NewEvent, SharedStore};
use serde::Deserialize;
use tracing::{debug, instrument};

fn duplicate(name: &str) -> Error {
    Error::DuplicateName(format!("Event name '{name}' already exists."))
}

fn invalid_datetime(reason: String) -> Error {
    debug!(%reason, "rejected schedule");
    Error::InvalidDatetime
}

/// Validate the host name against the configured policy
fn check_host(host_name: Option<&str>, settings: Settings) -> Result<()> {
    match host_name {
        Some(host_name) => check_name("host_name", host_name),
        None if settings.require_host_name => Err(Error::InvalidField {
            field: "host_name",
            problem: Problem::Missing,
        }),
        None => Ok(()),
    }
}

/// Get every event, or a single event by name
#[instrument(name = "events::list", skip(db))]
pub(crate) async fn list(
    Params(filter): Params<NameFilter>,
    State(db): State<SharedStore>,
) -> Result<Json<Listing<Event>>> {
    let Some(name) = filter.name else {
        return Ok(Json(Listing::Many(db.events().await?)));
    };
    check_name("name", &name)?;

    match db.event(&name).await? {
        Some(event) => Ok(Json(Listing::One(event))),
        None => Err(Error::NotFound(format!("Event '{name}' does not exist."))),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateEvent {
    name: String,
    host_name: Option<String>,
    address: Option<String>,
    schedule: Option<String>,
}

/// Create an event, registering its host if they are new
#[instrument(name = "events::create", skip(db))]
pub(crate) async fn create(
    State(db): State<SharedStore>,
    State(settings): State<Settings>,
    Payload(event): Payload<CreateEvent>,
) -> Result<(StatusCode, Json<Event>)> {
    check_name("name", &event.name)?;
    check_host(event.host_name.as_deref(), settings)?;

    let event = NewEvent {
        name: event.name,
        address: event.address,
        schedule: event.schedule,
        host_name: event.host_name,
    };

    match db.create_event(&event).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(created))),
        Err(StoreError::UniqueViolation { .. }) => Err(duplicate(&event.name)),
        Err(StoreError::InvalidArgument(reason)) => Err(invalid_datetime(reason)),
        Err(error @ (StoreError::ForeignKeyViolation { .. } | StoreError::Sqlx(_))) => {
            Err(error.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateEvent {
    name: String,
    new_name: String,
    host_name: Option<String>,
    address: Option<String>,
    schedule: Option<String>,
}

/// Update an event, keeping the stored value of every omitted field
#[instrument(name = "events::update", skip(db))]
pub(crate) async fn update(
    State(db): State<SharedStore>,
    Payload(event): Payload<UpdateEvent>,
) -> Result<Json<Event>> {
    check_name("name", &event.name)?;
    check_name("new_name", &event.new_name)?;
    if let Some(host_name) = &event.host_name {
        check_name("host_name", host_name)?;
    }

    let changes = EventChanges {
        new_name: event.new_name,
        address: event.address,
        schedule: event.schedule,
        host_name: event.host_name,
    };

    match db.update_event(&event.name, &changes).await {
        Ok(Some(updated)) => Ok(Json(updated)),
        Ok(None) => Err(Error::NotFound(format!(
            "Update event '{}' failed.",
            event.name
        ))),
        Err(StoreError::UniqueViolation { .. }) => Err(duplicate(&event.name)),
        Err(StoreError::InvalidArgument(reason)) => Err(invalid_datetime(reason)),
        Err(error @ (StoreError::ForeignKeyViolation { .. } | StoreError::Sqlx(_))) => {
            Err(error.into())
        }
    }
}

/// Remove an event
#[instrument(name = "events::delete", skip(db))]
pub(crate) async fn delete(
    Params(param): Params<NameParam>,
    State(db): State<SharedStore>,
) -> Result<Json<Event>> {
    check_name("name", &param.name)?;

    match db.delete_event(&param.name).await {
        Ok(Some(deleted)) => Ok(Json(deleted)),
        Ok(None) => Err(Error::NotFound(format!(
            "Delete event '{}' failed.",
            param.name
        ))),
        Err(
            error @ (StoreError::UniqueViolation { .. }
            | StoreError::ForeignKeyViolation { .. }
            | StoreError::InvalidArgument(_)
            | StoreError::Sqlx(_)),
        ) => Err(error.into()),
    }
}
