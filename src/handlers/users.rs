use super::{check_length, check_name, Error, Listing, NameFilter, NameParam, Params, Payload, Result};
use axum::{extract::State, http::StatusCode, response::Json};
use database::{Error as StoreError, SharedStore, User, UserOverview};
use serde::Deserialize;
use tracing::instrument;

fn not_found(name: &str) -> Error {
    Error::NotFound(format!("User '{name}' was not found."))
}

fn duplicate(name: &str) -> Error {
    Error::DuplicateName(format!("Username '{name}' already exists."))
}

fn unknown(name: &str) -> Error {
    Error::NotFound(format!("Username '{name}' does not exist."))
}

/// Get every user, or a single user by name
#[instrument(name = "users::list", skip(db))]
pub(crate) async fn list(
    Params(filter): Params<NameFilter>,
    State(db): State<SharedStore>,
) -> Result<Json<Listing<User>>> {
    let Some(name) = filter.name else {
        return Ok(Json(Listing::Many(db.users().await?)));
    };
    check_name("name", &name)?;

    match db.user(&name).await? {
        Some(user) => Ok(Json(Listing::One(user))),
        None => Err(unknown(&name)),
    }
}

/// Find the names of users matching a fragment
#[instrument(name = "users::search", skip(db))]
pub(crate) async fn search(
    Params(filter): Params<NameFilter>,
    State(db): State<SharedStore>,
) -> Result<Json<Vec<String>>> {
    if let Some(fragment) = &filter.name {
        check_length("name", fragment)?;
    }

    let names = db.search_users(filter.name.as_deref()).await?;
    Ok(Json(names))
}

/// Get every user, or a single user by name, along with how many events they host
#[instrument(name = "users::overview", skip(db))]
pub(crate) async fn overview(
    Params(filter): Params<NameFilter>,
    State(db): State<SharedStore>,
) -> Result<Json<Listing<UserOverview>>> {
    let Some(name) = filter.name else {
        return Ok(Json(Listing::Many(db.user_overviews().await?)));
    };
    check_name("name", &name)?;

    match db.user_overview(&name).await? {
        Some(overview) => Ok(Json(Listing::One(overview))),
        None => Err(unknown(&name)),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateUser {
    name: String,
}

/// Register a new user
#[instrument(name = "users::create", skip(db))]
pub(crate) async fn create(
    State(db): State<SharedStore>,
    Payload(user): Payload<CreateUser>,
) -> Result<(StatusCode, Json<User>)> {
    check_name("name", &user.name)?;

    match db.create_user(&user.name).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(created))),
        Err(StoreError::UniqueViolation { .. }) => Err(duplicate(&user.name)),
        Err(
            error @ (StoreError::ForeignKeyViolation { .. }
            | StoreError::InvalidArgument(_)
            | StoreError::Sqlx(_)),
        ) => Err(error.into()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateUser {
    name: String,
    new_name: String,
}

/// Rename an existing user
#[instrument(name = "users::update", skip(db))]
pub(crate) async fn update(
    State(db): State<SharedStore>,
    Payload(user): Payload<UpdateUser>,
) -> Result<Json<User>> {
    check_name("name", &user.name)?;
    check_name("new_name", &user.new_name)?;

    match db.rename_user(&user.name, &user.new_name).await {
        Ok(Some(updated)) => Ok(Json(updated)),
        Ok(None) => Err(not_found(&user.name)),
        Err(StoreError::UniqueViolation { .. }) => Err(duplicate(&user.name)),
        Err(
            error @ (StoreError::ForeignKeyViolation { .. }
            | StoreError::InvalidArgument(_)
            | StoreError::Sqlx(_)),
        ) => Err(error.into()),
    }
}

/// Remove a user that hosts no events
#[instrument(name = "users::delete", skip(db))]
pub(crate) async fn delete(
    Params(param): Params<NameParam>,
    State(db): State<SharedStore>,
) -> Result<Json<User>> {
    check_name("name", &param.name)?;

    match db.delete_user(&param.name).await {
        Ok(Some(deleted)) => Ok(Json(deleted)),
        Ok(None) => Err(not_found(&param.name)),
        Err(StoreError::ForeignKeyViolation { .. }) => Err(Error::ReferentialConstraint),
        Err(
            error @ (StoreError::UniqueViolation { .. }
            | StoreError::InvalidArgument(_)
            | StoreError::Sqlx(_)),
        ) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::App;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn create_then_duplicate() {
        let app = App::new();

        let (status, body) = app
            .send(Method::POST, "/users", Some(json!({ "name": "Alice" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Alice");
        assert!(body["id"].is_string());
        assert!(body["created_at"].is_string());

        let (status, body) = app
            .send(Method::POST, "/users", Some(json!({ "name": "Alice" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"]["error"], "Username 'Alice' already exists.");
    }

    #[tokio::test]
    async fn list_and_lookup() {
        let app = App::new();

        let (status, body) = app.send(Method::GET, "/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        app.send(Method::POST, "/users", Some(json!({ "name": "Alice" })))
            .await;

        let (status, body) = app.send(Method::GET, "/users?name=Alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Alice");

        let (status, body) = app.send(Method::GET, "/users?name=Bob", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"]["error"], "Username 'Bob' does not exist.");
    }

    #[tokio::test]
    async fn names_are_validated() {
        let app = App::new();

        let (status, body) = app
            .send(Method::POST, "/users", Some(json!({ "name": "" })))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"]["error"], "name cannot be empty");

        let (status, body) = app
            .send(Method::POST, "/users", Some(json!({ "name": "x".repeat(51) })))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"]["error"], "name must be at most 50 characters");
    }

    #[tokio::test]
    async fn rename_keeps_identity() {
        let app = App::new();

        let (_, created) = app
            .send(Method::POST, "/users", Some(json!({ "name": "Alice" })))
            .await;
        app.send(Method::POST, "/users", Some(json!({ "name": "Bob" })))
            .await;

        let (status, renamed) = app
            .send(
                Method::PUT,
                "/users",
                Some(json!({ "name": "Alice", "new_name": "Carol" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "Carol");
        assert_eq!(renamed["id"], created["id"]);
        assert_eq!(renamed["created_at"], created["created_at"]);

        let (status, body) = app
            .send(
                Method::PUT,
                "/users",
                Some(json!({ "name": "Carol", "new_name": "Bob" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"]["error"], "Username 'Carol' already exists.");

        let (status, body) = app
            .send(
                Method::PUT,
                "/users",
                Some(json!({ "name": "Alice", "new_name": "Dave" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"]["error"], "User 'Alice' was not found.");
    }

    #[tokio::test]
    async fn delete_returns_last_known_values() {
        let app = App::new();

        let (_, created) = app
            .send(Method::POST, "/users", Some(json!({ "name": "Alice" })))
            .await;

        let (status, deleted) = app.send(Method::DELETE, "/users?name=Alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, created);

        let (status, body) = app.send(Method::DELETE, "/users?name=Alice", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"]["error"], "User 'Alice' was not found.");
    }

    #[tokio::test]
    async fn delete_requires_a_name() {
        let app = App::new();

        let (status, body) = app.send(Method::DELETE, "/users", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"]["error"].is_string());
    }

    #[tokio::test]
    async fn hosts_cannot_be_deleted() {
        let app = App::new();

        app.send(
            Method::POST,
            "/events",
            Some(json!({ "name": "Launch", "host_name": "Alice" })),
        )
        .await;

        let (status, body) = app.send(Method::DELETE, "/users?name=Alice", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"]["error"], "User attached to an event. Cannot delete.");

        let (status, _) = app.send(Method::GET, "/users?name=Alice", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn search_ignores_case() {
        let app = App::new();

        for name in ["Alice", "alicia", "Bob", "100%"] {
            app.send(Method::POST, "/users", Some(json!({ "name": name })))
                .await;
        }

        let (status, body) = app.send(Method::GET, "/users/search?name=ALI", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Alice", "alicia"]));

        let (_, body) = app.send(Method::GET, "/users/search?name=%25", None).await;
        assert_eq!(body, json!(["100%"]));

        let (_, body) = app.send(Method::GET, "/users/search", None).await;
        assert_eq!(body.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn overview_counts_hosted_events() {
        let app = App::new();

        for event in ["Launch", "Retro"] {
            app.send(
                Method::POST,
                "/events",
                Some(json!({ "name": event, "host_name": "Alice" })),
            )
            .await;
        }
        app.send(Method::POST, "/users", Some(json!({ "name": "Bob" })))
            .await;

        let (status, body) = app
            .send(Method::GET, "/internal/users?name=Alice", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["event_count"], 2);

        let (_, body) = app.send(Method::GET, "/internal/users", None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) = app
            .send(Method::GET, "/internal/users?name=Carol", None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"]["error"], "Username 'Carol' does not exist.");
    }
}
