use axum::Server;
use clap::Parser;
use common::logging::Format;
use database::{PgPool, SharedStore};
use eventhub::{fixtures, Health, HttpProbe, Settings, StoreProbe};
use eyre::WrapErr;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{debug, error, info, Level};
use url::Url;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    common::dotenv()?;

    let config = Config::parse();
    common::logging::init(config.log_level, config.log_format);

    debug!(?config);

    let db = database::connect(&config.database_url)
        .await
        .wrap_err("failed to connect to the database")?;

    let result = serve(config, db.clone()).await;

    db.close().await;
    info!("database connections closed");

    result
}

/// Prepare the database and handle requests until shutdown
async fn serve(config: Config, db: PgPool) -> eyre::Result<()> {
    if config.migrate {
        migrator::apply(&db)
            .await
            .wrap_err("failed to apply migrations")?;
    }

    let store: SharedStore = Arc::new(db);

    if let Some(n) = config.prefill {
        let events = fixtures::generate(usize::from(n), &mut rand::thread_rng());
        let created = store
            .replace_all(&events)
            .await
            .wrap_err("failed to prefill the database")?;
        info!(count = created.len(), "prefilled the database");
    }

    let mut health = Health::new().with(StoreProbe::new("database", store.clone()));
    if let Some(url) = config.frontend_url {
        health = health.with(HttpProbe::new("frontend", url)?);
    }

    let settings = Settings {
        require_host_name: !config.allow_hostless_events,
        dev_routes: config.dev_routes,
    };
    if settings.dev_routes {
        info!("development routes are enabled");
    }

    let router = eventhub::router(store, health, settings);

    info!(address = %config.address, "listening and ready to handle requests");
    Server::try_bind(&config.address)
        .wrap_err("failed to bind to the address")?
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown())
        .await
        .wrap_err("failed to start server")?;

    Ok(())
}

/// Setup hyper graceful shutdown for SIGINT (ctrl+c) and SIGTERM
async fn shutdown() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            error!(%error, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                error!(%error, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("server successfully shutdown");
    info!("goodbye! o/");
}

/// A CRUD API for users and the events they host
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Config {
    /// The address for the server to listen on
    #[arg(long, default_value = "127.0.0.1:5001", env = "ADDRESS")]
    address: SocketAddr,

    /// The database to store users and events in
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// The default level to log at
    ///
    /// More specific log targets can be set using the `RUST_LOG` environment variable.
    #[arg(long, default_value_t = Level::INFO, env = "LOG_LEVEL")]
    log_level: Level,

    /// How log lines are formatted, either `pretty` or `json`
    #[arg(long, default_value_t = Format::Pretty, env = "LOG_FORMAT")]
    log_format: Format,

    /// The admin frontend to include in health checks
    #[arg(long, env = "FRONTEND_URL")]
    frontend_url: Option<Url>,

    /// Allow events to be created without a host
    #[arg(long, env = "ALLOW_HOSTLESS_EVENTS")]
    allow_hostless_events: bool,

    /// Mount the routes that wipe and reseed all data
    ///
    /// Never enable this in production.
    #[arg(long, env = "DEV_ROUTES")]
    dev_routes: bool,

    /// Replace all data with the given number of generated events on startup
    #[arg(long, env = "PREFILL", value_parser = clap::value_parser!(u16).range(0..=100))]
    prefill: Option<u16>,

    /// Apply pending migrations before serving requests
    #[arg(long, env = "MIGRATE")]
    migrate: bool,
}
