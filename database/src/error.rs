use sqlx::error::ErrorKind;
use std::fmt::{Display, Formatter};

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// SQLSTATE for a malformed date/time literal
const INVALID_DATETIME_FORMAT: &str = "22007";
/// SQLSTATE for an out-of-range date/time field
const DATETIME_FIELD_OVERFLOW: &str = "22008";

/// Errors that can occur while interacting with the store
#[derive(Debug)]
pub enum Error {
    /// A uniqueness constraint was violated
    UniqueViolation {
        /// The name of the violated constraint, if known
        constraint: Option<String>,
    },
    /// The change would leave a dangling reference
    ForeignKeyViolation {
        /// The name of the violated constraint, if known
        constraint: Option<String>,
    },
    /// An argument could not be interpreted
    InvalidArgument(String),
    /// Any other error from the database driver
    Sqlx(sqlx::Error),
}

impl Error {
    /// Whether the error was caused by a uniqueness constraint
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    /// Whether the error was caused by a foreign key constraint
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, Self::ForeignKeyViolation { .. })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UniqueViolation {
                constraint: Some(constraint),
            } => write!(f, "unique constraint {constraint:?} violated"),
            Self::UniqueViolation { constraint: None } => write!(f, "unique constraint violated"),
            Self::ForeignKeyViolation {
                constraint: Some(constraint),
            } => write!(f, "foreign key constraint {constraint:?} violated"),
            Self::ForeignKeyViolation { constraint: None } => {
                write!(f, "foreign key constraint violated")
            }
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            Self::Sqlx(_) => write!(f, "error while interacting with the database"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlx(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        let Some(database_error) = error.as_database_error() else {
            return Self::Sqlx(error);
        };

        let constraint = database_error.constraint().map(ToOwned::to_owned);
        match database_error.kind() {
            ErrorKind::UniqueViolation => return Self::UniqueViolation { constraint },
            ErrorKind::ForeignKeyViolation => return Self::ForeignKeyViolation { constraint },
            _ => {}
        }

        let invalid_datetime = matches!(
            database_error.code().as_deref(),
            Some(INVALID_DATETIME_FORMAT | DATETIME_FIELD_OVERFLOW)
        );
        if invalid_datetime {
            return Self::InvalidArgument(database_error.message().to_owned());
        }

        Self::Sqlx(error)
    }
}
