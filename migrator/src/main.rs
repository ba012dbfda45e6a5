use clap::{Parser, Subcommand};
use common::logging::Format;
use eyre::WrapErr;
use tracing::{debug, info, Level};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    common::dotenv()?;

    let config = Config::parse();
    common::logging::init(config.log_level, Format::Pretty);

    debug!(?config);

    let db = database::connect(&config.database_url)
        .await
        .wrap_err("failed to connect to the database")?;

    let result = match config.command {
        Command::Apply => migrator::apply(&db)
            .await
            .wrap_err("failed to apply migrations"),
        Command::Info => migrator::info(&db)
            .await
            .map(|statuses| {
                for status in statuses {
                    info!(
                        version = status.version,
                        description = %status.description,
                        applied = status.applied,
                        modified = status.modified,
                    );
                }
            })
            .wrap_err("failed to load migration info"),
        Command::Revert { target } => migrator::revert(&db, target)
            .await
            .wrap_err("failed to revert migrations"),
    };

    db.close().await;
    result
}

/// Manage the schema migrations of the database
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Config {
    /// The default level to log at
    ///
    /// More specific log targets can be set using the `RUST_LOG` environment variable. They must be
    /// formatted as tracing directives: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives
    #[arg(short, long, default_value_t = Level::INFO, env = "LOG_LEVEL")]
    log_level: Level,

    /// The database to run migrations on
    #[arg(short, long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply all pending migrations
    Apply,
    /// List all available migrations
    Info,
    /// Revert migrations
    ///
    /// If no target is provided, the most recent migration is reverted.
    Revert {
        /// The version to revert back to
        target: Option<i64>,
    },
}
