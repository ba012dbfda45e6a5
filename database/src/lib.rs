use sqlx::{postgres::PgConnectOptions, ConnectOptions};
use std::str::FromStr;
use tracing::{info, log::LevelFilter};

mod error;
mod event;
#[cfg(any(test, feature = "memory"))]
mod memory;
mod store;
mod user;

pub use error::Error;
pub(crate) use error::Result;
pub use event::{parse_schedule, Event, EventChanges, Host, NewEvent};
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
pub use sqlx::PgPool;
pub use store::{SharedStore, Store};
pub use user::{User, UserOverview};

/// The longest name a user or event may have
pub const MAX_NAME_LENGTH: usize = 50;

/// Connect to the database
pub async fn connect(url: &str) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(url)?.log_statements(LevelFilter::Debug);
    let db = PgPool::connect_with(options).await?;

    info!("connected to the database");

    Ok(db)
}
