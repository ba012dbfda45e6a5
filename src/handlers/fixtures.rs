use super::{Error, Result};
use crate::fixtures::{self, DEFAULT_COUNT, MAX_COUNT};
use axum::{body::Bytes, extract::State, http::StatusCode, response::Json};
use database::{Event, SharedStore};
use serde::Deserialize;
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
struct Reseed {
    #[serde(default = "default_count")]
    n: i64,
}

fn default_count() -> i64 {
    DEFAULT_COUNT as i64
}

/// Wipe every user and event, replacing them with randomly generated events
#[instrument(name = "fixtures::reset", skip_all)]
pub(crate) async fn reset(State(db): State<SharedStore>, body: Bytes) -> Result<Json<Vec<Event>>> {
    let n = if body.is_empty() {
        default_count()
    } else {
        let reseed = serde_json::from_slice::<Reseed>(&body).map_err(|error| Error::Rejection {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: format!("Failed to deserialize the JSON body: {error}"),
        })?;
        reseed.n
    };

    let n = usize::try_from(n)
        .ok()
        .filter(|n| *n <= MAX_COUNT)
        .ok_or(Error::InvalidFixtureCount)?;

    let events = fixtures::generate(n, &mut rand::thread_rng());
    let created = db.replace_all(&events).await?;
    info!(count = created.len(), "replaced all users and events");

    Ok(Json(created))
}

#[cfg(test)]
mod tests {
    use crate::{handlers::testing::App, Health, Settings};
    use axum::http::{Method, StatusCode};
    use database::Store;
    use serde_json::json;

    fn app() -> App {
        let settings = Settings {
            dev_routes: true,
            ..Settings::default()
        };
        App::with(Health::new(), settings)
    }

    #[tokio::test]
    async fn replaces_everything() {
        let app = app();
        app.send(Method::POST, "/users", Some(json!({ "name": "Alice" })))
            .await;

        let (status, body) = app
            .send(Method::POST, "/reset", Some(json!({ "n": 5 })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);

        let events = app.store.events().await.unwrap();
        assert_eq!(events.len(), 5);
        assert!(app.store.user("Alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn defaults_without_body() {
        let app = app();

        let (status, body) = app.send(Method::POST, "/fixtures", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn count_is_bounded() {
        let app = app();

        for n in [-1, 101] {
            let (status, body) = app
                .send(Method::POST, "/reset", Some(json!({ "n": n })))
                .await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body["detail"]["error"], "n must be between 0 and 100");
        }

        let (status, body) = app
            .send(Method::POST, "/reset", Some(json!({ "n": 0 })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn hidden_unless_enabled() {
        let app = App::new();

        let response = app.raw(Method::POST, "/reset", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
