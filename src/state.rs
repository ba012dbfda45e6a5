use crate::Health;
use axum::extract::FromRef;
use database::SharedStore;

/// State passed to each request handler
#[derive(Clone)]
pub(crate) struct AppState {
    pub db: SharedStore,
    pub health: Health,
    pub settings: Settings,
}

impl AppState {
    pub fn new(db: SharedStore, health: Health, settings: Settings) -> AppState {
        AppState {
            db,
            health,
            settings,
        }
    }
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Health {
    fn from_ref(state: &AppState) -> Self {
        state.health.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(state: &AppState) -> Self {
        state.settings
    }
}

/// Runtime behaviour that can be toggled when starting the server
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    /// Whether every event must name a host
    pub require_host_name: bool,
    /// Whether to mount the routes that wipe and reseed the data
    pub dev_routes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            require_host_name: true,
            dev_routes: false,
        }
    }
}
