//! Configuration for the machine agent.

use clap::Parser;
use serde::{Deserialize, Serialize};

use fleetmon_common::{BrokerConfig, LoggingConfig};
use fleetmon_publisher::{
    PublishConfig, PublisherArgs, PublisherConfig, PublisherError, Result, validate_common,
};

use crate::sampler::{DEFAULT_TOTAL_MEMORY_BYTES, HemispherePolicy};

/// Command line of the machine agent.
///
/// Every broker setting can also come from its environment variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "fleetmon-agent")]
#[command(about = "Publish simulated machine metrics to a RabbitMQ exchange")]
#[command(version)]
pub struct AgentArgs {
    #[command(flatten)]
    pub publisher: PublisherArgs,

    /// Identity of the simulated machine ("auto" uses the hostname).
    #[arg(long, env = "MACHINE_NAME")]
    pub machine_name: Option<String>,

    /// Seed for reproducible sample sequences.
    #[arg(long, env = "FLEETMON_SEED")]
    pub seed: Option<u64>,
}

/// Complete agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Broker connection settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Exchange, routing key and interval.
    #[serde(default)]
    pub publish: PublishConfig,

    /// Simulated machine settings.
    #[serde(default)]
    pub machine: MachineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Simulated machine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Machine name sent in every sample's metadata.
    /// Use "auto" to detect it from the hostname.
    #[serde(default)]
    pub name: String,

    /// Total memory of the machine; `mem_usage_bytes` is derived from it.
    #[serde(default = "default_total_memory_bytes")]
    pub total_memory_bytes: u64,

    /// Hemisphere suffix policy for coordinates (default: "sign").
    #[serde(default)]
    pub hemisphere: HemispherePolicy,

    /// RNG seed; unset means seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_total_memory_bytes() -> u64 {
    DEFAULT_TOTAL_MEMORY_BYTES
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            total_memory_bytes: default_total_memory_bytes(),
            hemisphere: HemispherePolicy::default(),
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Resolve file, CLI and environment into a validated configuration.
    pub fn from_args(args: &AgentArgs) -> Result<Self> {
        let mut config = Self::resolve(&args.publisher)?;

        if let Some(ref name) = args.machine_name {
            config.machine.name = name.clone();
        }
        if let Some(seed) = args.seed {
            config.machine.seed = Some(seed);
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the machine name to publish, resolving "auto" if needed.
    pub fn machine_name(&self) -> String {
        if self.machine.name == "auto" {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string())
        } else {
            self.machine.name.clone()
        }
    }
}

impl PublisherConfig for AgentConfig {
    fn broker(&self) -> &BrokerConfig {
        &self.broker
    }

    fn broker_mut(&mut self) -> &mut BrokerConfig {
        &mut self.broker
    }

    fn publish(&self) -> &PublishConfig {
        &self.publish
    }

    fn publish_mut(&mut self) -> &mut PublishConfig {
        &mut self.publish
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn logging_mut(&mut self) -> &mut LoggingConfig {
        &mut self.logging
    }

    fn validate(&self) -> Result<()> {
        validate_common(self)?;

        if self.machine.name.is_empty() {
            return Err(PublisherError::validation("MACHINE_NAME is not set"));
        }

        if self.machine.total_memory_bytes == 0 {
            return Err(PublisherError::validation(
                "total_memory_bytes must be > 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn env_args() -> AgentArgs {
        AgentArgs {
            publisher: PublisherArgs {
                host: Some("localhost".to_string()),
                port: Some(5672),
                username: Some("user".to_string()),
                password: Some("password".to_string()),
                queue: Some("q_metrics".to_string()),
                ..PublisherArgs::default()
            },
            machine_name: Some("machine_01".to_string()),
            seed: None,
        }
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: AgentConfig = fleetmon_common::parse_config("{}").unwrap();

        assert_eq!(config.publish.exchange, "e_metrics");
        assert_eq!(config.publish.routing_key, "metrics");
        assert_eq!(config.publish.interval(), Duration::from_secs(5));
        assert_eq!(config.machine.total_memory_bytes, 8_589_934_592);
        assert_eq!(config.machine.hemisphere, HemispherePolicy::Sign);
        assert!(config.machine.seed.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            broker: {
                host: "rabbitmq",
                port: 5672,
                username: "user",
                password: "password",
                vhost: "/fleet",
                queue: "q_metrics"
            },
            publish: {
                exchange: "e_metrics",
                routing_key: "metrics",
                durable: true,
                interval_ms: 1000
            },
            machine: {
                name: "machine_07",
                total_memory_bytes: 1048576,
                hemisphere: "fixed",
                seed: 99
            },
            logging: { level: "debug", format: "json" }
        }"#;

        let config: AgentConfig = fleetmon_common::parse_config(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.broker.vhost, "/fleet");
        assert!(config.publish.durable);
        assert_eq!(config.machine_name(), "machine_07");
        assert_eq!(config.machine.total_memory_bytes, 1_048_576);
        assert_eq!(config.machine.hemisphere, HemispherePolicy::Fixed);
        assert_eq!(config.machine.seed, Some(99));
    }

    #[test]
    fn test_from_args_environment_only() {
        let config = AgentConfig::from_args(&env_args()).unwrap();

        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.queue, "q_metrics");
        assert_eq!(config.machine_name(), "machine_01");
        assert_eq!(config.topology().queue, "q_metrics");
    }

    #[test]
    fn test_missing_machine_name() {
        let mut args = env_args();
        args.machine_name = None;

        let err = AgentConfig::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("MACHINE_NAME"));
    }

    #[test]
    fn test_missing_broker_host() {
        let mut args = env_args();
        args.publisher.host = None;

        let err = AgentConfig::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("RABBITMQ_HOST"));
    }

    #[test]
    fn test_missing_config_file() {
        let mut args = env_args();
        args.publisher.config = Some("/nonexistent/agent.json5".into());

        assert!(matches!(
            AgentConfig::from_args(&args),
            Err(PublisherError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_auto_machine_name() {
        let mut config = AgentConfig::default();
        config.machine.name = "auto".to_string();
        assert!(!config.machine_name().is_empty());
        assert_ne!(config.machine_name(), "auto");
    }

    #[test]
    fn test_zero_memory_rejected() {
        let mut config = AgentConfig::from_args(&env_args()).unwrap();
        config.machine.total_memory_bytes = 0;
        assert!(config.validate().is_err());
    }
}
