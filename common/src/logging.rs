use std::{fmt, str::FromStr};
use tracing::Level;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// How log lines are rendered
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    /// Human readable, one event per line
    #[default]
    Pretty,
    /// Structured JSON, one object per line
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}, expected one of: pretty, json")),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Setup logging and error reporting
///
/// More specific directives can be set with the `RUST_LOG` environment variable.
pub fn init(default_level: Level, format: Format) {
    let debug = cfg!(debug_assertions);
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    match format {
        Format::Pretty => Registry::default()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(debug)
                    .with_line_number(debug)
                    .with_target(true),
            )
            .with(ErrorLayer::default())
            .init(),
        Format::Json => Registry::default()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .with(ErrorLayer::default())
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::Format;

    #[test]
    fn parses_known_formats() {
        assert_eq!("pretty".parse::<Format>(), Ok(Format::Pretty));
        assert_eq!("JSON".parse::<Format>(), Ok(Format::Json));
        assert_eq!("text".parse::<Format>(), Ok(Format::Pretty));
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!("yaml".parse::<Format>().is_err());
    }
}
