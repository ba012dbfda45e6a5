use axum::response::Json;
use database::MAX_NAME_LENGTH;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

mod error;
pub(crate) mod events;
mod extract;
pub(crate) mod fixtures;
mod health;
#[cfg(test)]
mod testing;
pub(crate) mod users;

use error::{Error, Problem, Result};
use extract::{Params, Payload};
pub(crate) use health::healthy;

/// Greet whoever is at the root of the API
#[instrument(name = "home")]
pub(crate) async fn home() -> Json<Value> {
    Json(json!({ "message": "Welcome to the eventhub API" }))
}

/// An optional name to narrow a listing down to a single record
#[derive(Debug, Deserialize)]
pub(crate) struct NameFilter {
    name: Option<String>,
}

/// The name identifying the record to operate on
#[derive(Debug, Deserialize)]
pub(crate) struct NameParam {
    name: String,
}

/// Either a single looked up record or every record
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    One(T),
    Many(Vec<T>),
}

/// Ensure a name is present and fits in the store
fn check_name(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidField {
            field,
            problem: Problem::Empty,
        });
    }

    check_length(field, value)
}

fn check_length(field: &'static str, value: &str) -> Result<()> {
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::InvalidField {
            field,
            problem: Problem::TooLong,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_length, check_name, testing::App};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[test]
    fn names_must_be_present() {
        assert!(check_name("name", "").is_err());
        assert!(check_name("name", "a").is_ok());
        assert!(check_length("name", "").is_ok());
    }

    #[test]
    fn names_are_counted_in_characters() {
        assert!(check_name("name", &"ü".repeat(50)).is_ok());
        assert!(check_name("name", &"ü".repeat(51)).is_err());
    }

    #[tokio::test]
    async fn greets() {
        let app = App::new();

        let (status, body) = app.send(Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn malformed_bodies_use_the_envelope() {
        let app = App::new();

        let (status, body) = app
            .send(Method::POST, "/users", Some(json!({ "nickname": "Alice" })))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"]["error"].is_string());
    }

    #[tokio::test]
    async fn responses_carry_request_metadata() {
        let app = App::new();

        let response = app.raw(Method::GET, "/users", None).await;
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-process-time"));
    }
}
