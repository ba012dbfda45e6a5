use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use database::MAX_NAME_LENGTH;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use tracing::{error, warn};

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur in request handlers
#[derive(Debug)]
pub(crate) enum Error {
    /// The requested record does not exist
    NotFound(String),
    /// A record with the name already exists
    DuplicateName(String),
    /// The schedule could not be parsed
    InvalidDatetime,
    /// The user still hosts at least one event
    ReferentialConstraint,
    InvalidField {
        field: &'static str,
        problem: Problem,
    },
    InvalidFixtureCount,
    /// The request could not be decoded
    Rejection {
        status: StatusCode,
        message: String,
    },
    Database(database::Error),
}

/// Why a field failed validation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Problem {
    Empty,
    TooLong,
    Missing,
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateName(_) | Self::InvalidDatetime | Self::ReferentialConstraint => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidField { .. } | Self::InvalidFixtureCount => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Rejection { status, .. } => *status,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(message) | Self::DuplicateName(message) => write!(f, "{message}"),
            Self::InvalidDatetime => write!(
                f,
                "Invalid datetime format. Datetime string must look like this: '2010-12-27T23:59:59-07:00'"
            ),
            Self::ReferentialConstraint => write!(f, "User attached to an event. Cannot delete."),
            Self::InvalidField { field, problem } => match problem {
                Problem::Empty => write!(f, "{field} cannot be empty"),
                Problem::TooLong => write!(f, "{field} must be at most {MAX_NAME_LENGTH} characters"),
                Problem::Missing => write!(f, "{field} is required"),
            },
            Self::InvalidFixtureCount => write!(
                f,
                "n must be between 0 and {}",
                crate::fixtures::MAX_COUNT
            ),
            Self::Rejection { message, .. } => write!(f, "{message}"),
            Self::Database(_) => write!(f, "unexpected database error"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        use std::error::Error as _;

        if let Self::Database(error) = &self {
            match error.source() {
                Some(source) => error!(%error, %source, "unexpected database error"),
                None => error!(%error, "unexpected database error"),
            }
            return ApiError::response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
        }

        let message = self.to_string();
        warn!(status = self.status().as_u16(), %message, "request failed");

        ApiError::response(self.status(), &message)
    }
}

impl From<database::Error> for Error {
    fn from(error: database::Error) -> Self {
        Self::Database(error)
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejection {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejection {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: rejection.body_text(),
        }
    }
}

/// The envelope every failure is reported in
#[derive(Serialize)]
pub(crate) struct ApiError<'m> {
    pub detail: Detail<'m>,
}

#[derive(Serialize)]
pub(crate) struct Detail<'m> {
    pub error: &'m str,
}

impl<'m> ApiError<'m> {
    fn response(status: StatusCode, message: &'m str) -> Response {
        let body = ApiError {
            detail: Detail { error: message },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Problem};
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn field_messages() {
        let empty = Error::InvalidField {
            field: "name",
            problem: Problem::Empty,
        };
        assert_eq!(empty.to_string(), "name cannot be empty");

        let long = Error::InvalidField {
            field: "new_name",
            problem: Problem::TooLong,
        };
        assert_eq!(long.to_string(), "new_name must be at most 50 characters");

        let missing = Error::InvalidField {
            field: "host_name",
            problem: Problem::Missing,
        };
        assert_eq!(missing.to_string(), "host_name is required");
    }

    #[test]
    fn statuses() {
        let cases = [
            (Error::NotFound(String::new()), StatusCode::NOT_FOUND),
            (Error::DuplicateName(String::new()), StatusCode::BAD_REQUEST),
            (Error::InvalidDatetime, StatusCode::BAD_REQUEST),
            (Error::ReferentialConstraint, StatusCode::BAD_REQUEST),
            (Error::InvalidFixtureCount, StatusCode::UNPROCESSABLE_ENTITY),
            (
                Error::Database(database::Error::InvalidArgument(String::new())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
