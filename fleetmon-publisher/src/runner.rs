//! Publisher runner for lifecycle management.

use std::sync::Arc;

use fleetmon_common::init_tracing;

use crate::config::PublisherConfig;
use crate::error::{PublisherError, Result};
use crate::publish_loop::{LoopStats, PublisherLoop, SampleSource};
use crate::session::{AmqpSession, BrokerSession};
use crate::shutdown::{self, Shutdown};

/// Runner that manages the lifecycle of a telemetry publisher.
///
/// Handles:
/// - Logging initialization
/// - Broker connection and topology declaration
/// - Signal handling (Ctrl+C, SIGTERM)
/// - Running the publish loop and closing the session
///
/// # Example
///
/// ```ignore
/// use fleetmon_publisher::{PublisherConfig, PublisherRunner};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = MyAgentConfig::resolve(&args)?;
///     config.validate()?;
///
///     let runner = PublisherRunner::new("my-agent", config).await?;
///     runner.run(MySampler::new()).await?;
///     Ok(())
/// }
/// ```
pub struct PublisherRunner<C: PublisherConfig> {
    /// Agent name for logging.
    name: String,
    /// Agent version.
    version: String,
    /// The resolved configuration.
    config: C,
    /// Broker session, shared with the publish loop.
    session: Arc<AmqpSession>,
    /// Shutdown trigger handed to the signal listener.
    shutdown: Shutdown,
}

impl<C: PublisherConfig> PublisherRunner<C> {
    /// Create a new runner.
    ///
    /// This will:
    /// 1. Initialize logging based on config
    /// 2. Connect to the broker
    /// 3. Declare the topology
    ///
    /// Connection and topology failures are returned; the caller is expected
    /// to exit.
    pub async fn new(name: impl Into<String>, config: C) -> Result<Self> {
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION").to_string();

        init_tracing(config.logging()).map_err(|e| PublisherError::config(e.to_string()))?;

        tracing::info!(agent = %name, version = %version, "Starting publisher");

        let session = Arc::new(AmqpSession::connect(config.broker()).await?);

        if let Err(e) = session.declare_topology(&config.topology()).await {
            if let Err(close_err) = session.close().await {
                tracing::warn!(error = %close_err, "Error closing broker session");
            }
            return Err(e);
        }

        let (shutdown, _) = shutdown::channel();

        Ok(Self {
            name,
            version,
            config,
            session,
            shutdown,
        })
    }

    /// Get the agent name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the agent version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Publish samples from `source` until Ctrl+C / SIGTERM or a fatal error.
    ///
    /// The session is closed exactly once by the publish loop before this
    /// returns.
    pub async fn run<G: SampleSource>(self, source: G) -> Result<LoopStats> {
        let signals = tokio::spawn(shutdown::listen_for_signals(self.shutdown.clone()));

        let mut publisher = PublisherLoop::new(self.session.clone(), source, self.shutdown.subscribe())
            .with_routing_key(&self.config.publish().routing_key)
            .with_interval(self.config.publish().interval());

        tracing::info!(
            agent = %self.name,
            endpoint = %self.session.endpoint(),
            "Publisher running. Press Ctrl+C to stop."
        );

        let result = publisher.run().await;
        signals.abort();

        match result {
            Ok(ref stats) => {
                let last_published = stats
                    .last_published_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                tracing::info!(
                    agent = %self.name,
                    version = %self.version,
                    published = stats.published,
                    failed = stats.failed,
                    last_published = %last_published,
                    "Goodbye!"
                );
            }
            Err(ref e) => {
                tracing::error!(agent = %self.name, error = %e, "Publisher stopped on fatal error");
            }
        }

        result
    }
}
