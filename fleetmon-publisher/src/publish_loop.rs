//! Periodic metric publishing loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use fleetmon_common::{MachineMetricSample, encode_sample};

use crate::error::Result;
use crate::session::BrokerSession;
use crate::shutdown::ShutdownSignal;
use crate::topology::DEFAULT_ROUTING_KEY;

/// Default time between two samples.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Produces one metric sample per tick.
pub trait SampleSource: Send {
    fn next_sample(&mut self) -> MachineMetricSample;
}

/// Lifecycle of a [`PublisherLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Built, no tick yet. The session is connected with topology declared.
    Initial,
    /// Publishing a sample every interval.
    Running,
    /// Shutdown observed; no further publish will start.
    Stopping,
    /// Session closed.
    Terminal,
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Sample sent; payload size in bytes.
    Published(usize),
    /// Publish failed but the connection is still usable.
    Failed,
    /// Shutdown was requested, nothing was sent.
    Stopped,
}

/// Counters kept across ticks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoopStats {
    /// Samples handed to the broker.
    pub published: u64,
    /// Samples lost to recoverable publish failures.
    pub failed: u64,
    /// Wall-clock time of the last successful publish.
    pub last_published_at: Option<DateTime<Utc>>,
}

impl LoopStats {
    /// Ticks that attempted a publish.
    pub fn attempted(&self) -> u64 {
        self.published + self.failed
    }
}

/// Generates, serializes and publishes one sample per interval until
/// shutdown is requested or the broker connection is lost.
///
/// Shutdown is checked before every publish and raced against the wait
/// between ticks. A publish already in progress always runs to completion.
pub struct PublisherLoop<S: BrokerSession + ?Sized, G: SampleSource> {
    session: Arc<S>,
    source: G,
    routing_key: String,
    interval: Duration,
    shutdown: ShutdownSignal,
    state: LoopState,
    stats: LoopStats,
}

impl<S: BrokerSession + ?Sized, G: SampleSource> PublisherLoop<S, G> {
    /// Create a loop publishing under the default routing key every
    /// [`DEFAULT_INTERVAL`].
    pub fn new(session: Arc<S>, source: G, shutdown: ShutdownSignal) -> Self {
        Self {
            session,
            source,
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            interval: DEFAULT_INTERVAL,
            shutdown,
            state: LoopState::Initial,
            stats: LoopStats::default(),
        }
    }

    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until shutdown or a fatal error, then close the session once.
    ///
    /// Returns the final counters on a clean stop. A lost connection or an
    /// unserializable sample is returned as an error after a best-effort
    /// close.
    pub async fn run(&mut self) -> Result<LoopStats> {
        info!(
            routing_key = %self.routing_key,
            interval_ms = self.interval.as_millis() as u64,
            "Publish loop running"
        );

        let outcome = loop {
            match self.tick().await {
                Ok(TickOutcome::Stopped) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }

            if self.wait().await {
                break Ok(());
            }
        };

        self.state = LoopState::Stopping;

        if let Err(ref e) = outcome {
            error!(error = %e, "Publish loop aborted");
        }

        if let Err(e) = self.session.close().await {
            warn!(error = %e, "Error closing broker session");
        }
        self.state = LoopState::Terminal;

        info!(
            published = self.stats.published,
            failed = self.stats.failed,
            "Publish loop stopped"
        );

        outcome.map(|()| self.stats.clone())
    }

    /// Generate and publish a single sample.
    ///
    /// Does nothing once shutdown has been requested.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let stopping = self.shutdown.is_triggered()
            || matches!(self.state, LoopState::Stopping | LoopState::Terminal);
        if stopping {
            if self.state != LoopState::Terminal {
                self.state = LoopState::Stopping;
            }
            return Ok(TickOutcome::Stopped);
        }
        self.state = LoopState::Running;

        let sample = self.source.next_sample();
        let payload = encode_sample(&sample)?;

        match self.session.publish(&self.routing_key, &payload).await {
            Ok(()) => {
                self.stats.published += 1;
                self.stats.last_published_at = Some(Utc::now());
                info!(
                    machine = %sample.machine_name(),
                    routing_key = %self.routing_key,
                    bytes = payload.len(),
                    "Metric sent"
                );
                Ok(TickOutcome::Published(payload.len()))
            }
            Err(e) if e.is_fatal_in_loop() => Err(e),
            Err(e) => {
                self.stats.failed += 1;
                warn!(
                    machine = %sample.machine_name(),
                    error = %e,
                    failed = self.stats.failed,
                    "Failed to publish metric, skipping tick"
                );
                Ok(TickOutcome::Failed)
            }
        }
    }

    /// Sleep one interval. Returns `true` if shutdown cut the wait short.
    async fn wait(&mut self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => false,
            _ = self.shutdown.triggered() => true,
        }
    }
}
