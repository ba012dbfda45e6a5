use super::error::Detail;
use crate::{health::Report, Health};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{instrument, warn};

#[derive(Serialize)]
struct Healthy<'r> {
    ok: &'r [String],
}

#[derive(Serialize)]
struct Unhealthy<'r> {
    detail: Detail<'r>,
    ok: &'r [String],
    failing: &'r BTreeMap<String, String>,
}

/// Report whether every dependency is reachable
#[instrument(name = "healthy", skip_all)]
pub(crate) async fn healthy(State(health): State<Health>) -> Response {
    let report = health.check().await;
    respond(&report)
}

fn respond(report: &Report) -> Response {
    if report.is_healthy() {
        return Json(Healthy { ok: &report.ok }).into_response();
    }

    let failing = serde_json::to_string(&report.failing).unwrap_or_default();
    let message = format!("Health check failed: {failing}");
    warn!(%message, "service is unhealthy");

    let body = Unhealthy {
        detail: Detail { error: &message },
        ok: &report.ok,
        failing: &report.failing,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use crate::{handlers::testing::App, health::tests::Fixed, Health, Settings};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn reports_ok_probes() {
        let health = Health::new().with(Fixed {
            name: "database",
            failure: None,
        });
        let app = App::with(health, Settings::default());

        let (status, body) = app.send(Method::GET, "/healthy", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": ["database"] }));
    }

    #[tokio::test]
    async fn reports_failing_probes() {
        let health = Health::new()
            .with(Fixed {
                name: "database",
                failure: None,
            })
            .with(Fixed {
                name: "frontend",
                failure: Some("timed out"),
            });
        let app = App::with(health, Settings::default());

        let (status, body) = app.send(Method::GET, "/healthy", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "detail": { "error": r#"Health check failed: {"frontend":"timed out"}"# },
                "ok": ["database"],
                "failing": { "frontend": "timed out" },
            })
        );
    }
}
