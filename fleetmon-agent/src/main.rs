//! Machine agent publishing simulated metrics to RabbitMQ.

use anyhow::Result;
use clap::Parser;
use fleetmon_publisher::{PublisherConfig, PublisherRunner};

use fleetmon_agent::config::{AgentArgs, AgentConfig};
use fleetmon_agent::sampler::MetricSampler;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments and environment
    let args = AgentArgs::parse();

    // Resolve config file + environment, fail early on missing variables
    let config = AgentConfig::from_args(&args)?;

    let machine_name = config.machine_name();
    let mut sampler = MetricSampler::new(&machine_name, config.machine.total_memory_bytes)
        .with_hemisphere(config.machine.hemisphere);
    if let Some(seed) = config.machine.seed {
        sampler = sampler.with_seed(seed);
    }

    // Connect and declare topology; failures here abort startup
    let runner = PublisherRunner::new("fleetmon-agent", config).await?;

    tracing::info!(
        agent = %runner.name(),
        version = %runner.version(),
        machine = %machine_name,
        exchange = %runner.config().publish().exchange,
        queue = %runner.config().broker().queue,
        interval_ms = runner.config().publish().interval_ms,
        hemisphere = ?runner.config().machine.hemisphere,
        "Machine agent running"
    );

    // Run until Ctrl+C; a lost connection exits nonzero
    runner.run(sampler).await?;

    Ok(())
}
