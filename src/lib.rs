use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use database::SharedStore;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod fixtures;
mod handlers;
pub mod health;
mod middleware;
mod state;

pub use health::{Health, HttpProbe, Probe, StoreProbe};
pub(crate) use state::AppState;
pub use state::Settings;

/// Setup the routes
pub fn router(db: SharedStore, health: Health, settings: Settings) -> Router {
    let state = AppState::new(db, health, settings);

    let mut router = Router::new()
        .route("/", get(handlers::home))
        .route("/healthy", get(handlers::healthy))
        .route(
            "/users",
            get(handlers::users::list)
                .post(handlers::users::create)
                .put(handlers::users::update)
                .delete(handlers::users::delete),
        )
        .route("/users/search", get(handlers::users::search))
        .route("/internal/users", get(handlers::users::overview))
        .route(
            "/events",
            get(handlers::events::list)
                .post(handlers::events::create)
                .put(handlers::events::update)
                .delete(handlers::events::delete),
        );

    if settings.dev_routes {
        router = router
            .route("/reset", post(handlers::fixtures::reset))
            .route("/fixtures", post(handlers::fixtures::reset));
    }

    router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(middleware::make_span)
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CorsLayer::permissive())
            .layer(from_fn(middleware::process_time)),
    )
}
