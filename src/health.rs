use async_trait::async_trait;
use database::SharedStore;
use eyre::WrapErr;
use futures::future::join_all;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tracing::{instrument, warn};
use url::Url;

/// A dependency whose availability contributes to the health of the service
#[async_trait]
pub trait Probe: Send + Sync {
    /// The name the dependency is reported under
    fn name(&self) -> &str;

    /// Attempt to reach the dependency once
    async fn ping(&self) -> eyre::Result<()>;
}

/// Checks that the store accepts queries
pub struct StoreProbe {
    name: String,
    store: SharedStore,
}

impl StoreProbe {
    pub fn new(name: impl Into<String>, store: SharedStore) -> Self {
        StoreProbe {
            name: name.into(),
            store,
        }
    }
}

#[async_trait]
impl Probe for StoreProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> eyre::Result<()> {
        self.store.ping().await.wrap_err("store is unreachable")
    }
}

/// Checks that an HTTP service responds successfully
pub struct HttpProbe {
    name: String,
    url: Url,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(name: impl Into<String>, url: Url) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(concat!("eventhub/", env!("CARGO_PKG_VERSION")))
            .build()
            .wrap_err("failed to build http client")?;

        Ok(HttpProbe {
            name: name.into(),
            url,
            client,
        })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> eyre::Result<()> {
        self.client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// The collection of probes making up the service's health
#[derive(Clone, Default)]
pub struct Health {
    probes: Vec<Arc<dyn Probe>>,
}

impl Health {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional probe
    pub fn with<P: Probe + 'static>(mut self, probe: P) -> Self {
        self.probes.push(Arc::new(probe));
        self
    }

    /// Ping every probe concurrently and collect the outcomes
    #[instrument(name = "Health::check", skip_all, fields(probes = self.probes.len()))]
    pub async fn check(&self) -> Report {
        let outcomes = join_all(self.probes.iter().map(|probe| async move {
            let result = probe.ping().await;
            (probe.name().to_owned(), result)
        }))
        .await;

        let mut report = Report::default();
        for (name, result) in outcomes {
            match result {
                Ok(()) => report.ok.push(name),
                Err(error) => {
                    let error = format!("{error:#}");
                    warn!(probe = %name, %error, "probe failed");
                    report.failing.insert(name, error);
                }
            }
        }

        report
    }
}

/// The outcome of a health check
#[derive(Debug, Default, Serialize)]
pub struct Report {
    /// Names of the probes that succeeded
    pub ok: Vec<String>,
    /// The error of every probe that failed, by name
    pub failing: BTreeMap<String, String>,
}

impl Report {
    pub fn is_healthy(&self) -> bool {
        self.failing.is_empty()
    }
}
