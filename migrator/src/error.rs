use sqlx::migrate::MigrateError;
use std::fmt::{self, Formatter};

#[derive(Debug)]
pub enum Error {
    /// Failed to run a migration or read the migration history
    Migrate(MigrateError),
    /// Failed to talk to the database
    Database(sqlx::Error),
    /// The requested target does not exist in the source
    UnknownVersion(i64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Migrate(_) => write!(f, "error while running migrations"),
            Self::Database(_) => write!(f, "error while interacting with the database"),
            Self::UnknownVersion(version) => {
                write!(f, "migration {version} does not exist in the source")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Migrate(e) => Some(e),
            Self::Database(e) => Some(e),
            Self::UnknownVersion(_) => None,
        }
    }
}

impl From<MigrateError> for Error {
    fn from(err: MigrateError) -> Self {
        Self::Migrate(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}
