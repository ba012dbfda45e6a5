use sqlx::{
    migrate::{Migrate, Migrator},
    PgPool,
};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

mod error;

pub use error::Error;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

type Result<T> = std::result::Result<T, Error>;

/// The state of a single migration
#[derive(Debug)]
pub struct Status {
    pub version: i64,
    pub description: String,
    pub applied: bool,
    /// Whether the applied migration differs from the source
    pub modified: bool,
}

/// Apply all pending migrations
#[instrument(skip_all)]
pub async fn apply(db: &PgPool) -> Result<()> {
    MIGRATOR.run(db).await?;
    info!("migrations applied");

    Ok(())
}

/// Retrieve the current state of the migrations
#[instrument(skip_all)]
pub async fn info(db: &PgPool) -> Result<Vec<Status>> {
    let mut conn = db.acquire().await?;
    conn.ensure_migrations_table().await?;

    let applied = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|m| (m.version, m.checksum))
        .collect::<HashMap<_, _>>();

    let statuses = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|migration| {
            let checksum = applied.get(&migration.version);
            let modified = checksum.is_some_and(|checksum| *checksum != migration.checksum);
            if modified {
                warn!(version = migration.version, description = %migration.description, "applied checksum is different from source checksum");
            }

            Status {
                version: migration.version,
                description: migration.description.to_string(),
                applied: checksum.is_some(),
                modified,
            }
        })
        .collect();

    Ok(statuses)
}

/// Undo migrations down to the specified target
///
/// If no target is provided, only the most recent migration is reverted.
#[instrument(skip(db))]
pub async fn revert(db: &PgPool, target: Option<i64>) -> Result<()> {
    let target = match target {
        Some(target) => {
            if target != 0 && !MIGRATOR.iter().any(|m| m.version == target) {
                return Err(Error::UnknownVersion(target));
            }
            target
        }
        None => {
            let mut conn = db.acquire().await?;
            conn.ensure_migrations_table().await?;

            let mut applied = conn
                .list_applied_migrations()
                .await?
                .into_iter()
                .map(|m| m.version)
                .collect::<Vec<_>>();
            applied.sort_unstable();

            if applied.is_empty() {
                info!("no migrations available to revert");
                return Ok(());
            }
            applied.iter().rev().nth(1).copied().unwrap_or(0)
        }
    };

    MIGRATOR.undo(db, target).await?;
    info!(target, "reverted migrations");

    Ok(())
}
