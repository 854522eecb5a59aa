//! fleetmon Publisher Framework
//!
//! Common abstractions for agents that publish machine telemetry to an AMQP
//! broker.
//!
//! # Overview
//!
//! This framework provides:
//! - [`BrokerSession`] and its AMQP implementation [`AmqpSession`]
//! - [`Topology`] for the exchange / queue / binding declared at startup
//! - [`PublisherLoop`] that generates, serializes and publishes one sample per tick
//! - [`Shutdown`] / [`ShutdownSignal`] for cancelling the loop from a signal handler
//! - [`PublisherRunner`] for the agent lifecycle (startup, signals, shutdown)
//! - [`PublisherConfig`] and [`PublisherArgs`] for file and environment configuration
//!
//! # Example
//!
//! ```ignore
//! use fleetmon_publisher::{PublisherArgs, PublisherConfig, PublisherRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MyAgentConfig::resolve(&args)?;
//!     config.validate()?;
//!
//!     let runner = PublisherRunner::new("my-agent", config).await?;
//!
//!     // Run until Ctrl+C
//!     runner.run(my_sampler).await?;
//!     Ok(())
//! }
//! ```

mod args;
mod config;
mod error;
mod publish_loop;
mod runner;
mod session;
pub mod shutdown;
mod topology;

pub use args::PublisherArgs;
pub use config::{PublishConfig, PublisherConfig, validate_common};
pub use error::{PublisherError, Result};
pub use publish_loop::{
    DEFAULT_INTERVAL, LoopState, LoopStats, PublisherLoop, SampleSource, TickOutcome,
};
pub use runner::PublisherRunner;
pub use session::{AmqpSession, BrokerSession};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use topology::{
    Binding, DEFAULT_EXCHANGE, DEFAULT_ROUTING_KEY, DeclaredTopologies, Topology,
};

// Re-export commonly used types from fleetmon-common
pub use fleetmon_common::{
    BrokerConfig, Coordinates, LogFormat, LoggingConfig, MachineMetricSample,
};
