//! Configuration traits and utilities.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use fleetmon_common::{BrokerConfig, LoggingConfig};

use crate::args::PublisherArgs;
use crate::error::{PublisherError, Result};
use crate::topology::{DEFAULT_EXCHANGE, DEFAULT_ROUTING_KEY, Topology};

/// Publishing settings: where samples go and how often.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Direct exchange receiving samples (default: "e_metrics").
    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// Routing key for published samples and the queue binding (default: "metrics").
    #[serde(default = "default_routing_key")]
    pub routing_key: String,

    /// Declare exchange and queue as durable (default: false).
    #[serde(default)]
    pub durable: bool,

    /// Milliseconds between two samples (default: 5000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_exchange() -> String {
    DEFAULT_EXCHANGE.to_string()
}

fn default_routing_key() -> String {
    DEFAULT_ROUTING_KEY.to_string()
}

fn default_interval_ms() -> u64 {
    5000
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            exchange: default_exchange(),
            routing_key: default_routing_key(),
            durable: false,
            interval_ms: default_interval_ms(),
        }
    }
}

impl PublishConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Topology binding `queue` to this exchange.
    pub fn topology(&self, queue: &str) -> Topology {
        Topology::new(queue)
            .with_exchange(&self.exchange)
            .with_routing_key(&self.routing_key)
            .with_durable(self.durable)
    }
}

/// Trait for publisher configuration types.
///
/// Implement this trait for an agent's configuration struct to get
/// file loading, environment overrides and the shared validation.
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use fleetmon_publisher::{BrokerConfig, LoggingConfig, PublishConfig, PublisherConfig};
///
/// #[derive(Debug, Default, Deserialize)]
/// pub struct MyAgentConfig {
///     #[serde(default)]
///     pub broker: BrokerConfig,
///     #[serde(default)]
///     pub publish: PublishConfig,
///     #[serde(default)]
///     pub logging: LoggingConfig,
/// }
///
/// impl PublisherConfig for MyAgentConfig {
///     fn broker(&self) -> &BrokerConfig { &self.broker }
///     fn broker_mut(&mut self) -> &mut BrokerConfig { &mut self.broker }
///     fn publish(&self) -> &PublishConfig { &self.publish }
///     fn publish_mut(&mut self) -> &mut PublishConfig { &mut self.publish }
///     fn logging(&self) -> &LoggingConfig { &self.logging }
///     fn logging_mut(&mut self) -> &mut LoggingConfig { &mut self.logging }
/// }
/// ```
pub trait PublisherConfig: Sized + Default + DeserializeOwned {
    /// Get the broker connection configuration.
    fn broker(&self) -> &BrokerConfig;

    fn broker_mut(&mut self) -> &mut BrokerConfig;

    /// Get the publishing configuration.
    fn publish(&self) -> &PublishConfig;

    fn publish_mut(&mut self) -> &mut PublishConfig;

    /// Get the logging configuration.
    fn logging(&self) -> &LoggingConfig;

    fn logging_mut(&mut self) -> &mut LoggingConfig;

    /// Topology to declare at startup.
    fn topology(&self) -> Topology {
        self.publish().topology(&self.broker().queue)
    }

    /// Validate the configuration.
    ///
    /// Override to add agent-specific checks; call [`validate_common`] from
    /// the override.
    fn validate(&self) -> Result<()> {
        validate_common(self)
    }

    /// Load configuration from a JSON5 file.
    ///
    /// Does not validate: environment overrides are usually applied first.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PublisherError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        fleetmon_common::parse_config(&content).map_err(|e| match e {
            fleetmon_common::Error::Config(msg) => PublisherError::ConfigParse(msg),
            other => other.into(),
        })
    }

    /// Build the configuration from the optional file in `args`, then
    /// overlay the CLI / environment values.
    fn resolve(args: &PublisherArgs) -> Result<Self> {
        let mut config = match args.config {
            Some(ref path) => Self::load(path)?,
            None => Self::default(),
        };
        args.apply(&mut config);
        Ok(config)
    }
}

/// Checks shared by every publisher: required broker settings are present
/// and the loop has something sensible to do.
pub fn validate_common<C: PublisherConfig>(config: &C) -> Result<()> {
    let broker = config.broker();
    let required = [
        ("RABBITMQ_HOST", &broker.host),
        ("RABBITMQ_USERNAME", &broker.username),
        ("RABBITMQ_PASSWORD", &broker.password),
        ("RABBITMQ_QUEUE", &broker.queue),
    ];

    for (var, value) in required {
        if value.is_empty() {
            return Err(PublisherError::validation(format!("{} is not set", var)));
        }
    }

    if broker.port == 0 {
        return Err(PublisherError::validation("RABBITMQ_PORT must be > 0"));
    }

    let publish = config.publish();
    if publish.exchange.is_empty() {
        return Err(PublisherError::validation("exchange must not be empty"));
    }
    if publish.routing_key.is_empty() {
        return Err(PublisherError::validation("routing_key must not be empty"));
    }
    if publish.interval_ms == 0 {
        return Err(PublisherError::validation("interval_ms must be > 0"));
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Default, Deserialize)]
    pub(crate) struct TestConfig {
        #[serde(default)]
        pub broker: BrokerConfig,
        #[serde(default)]
        pub publish: PublishConfig,
        #[serde(default)]
        pub logging: LoggingConfig,
    }

    impl PublisherConfig for TestConfig {
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
    }

    fn complete() -> TestConfig {
        let mut config = TestConfig::default();
        config.broker.host = "localhost".to_string();
        config.broker.username = "user".to_string();
        config.broker.password = "password".to_string();
        config.broker.queue = "q_metrics".to_string();
        config
    }

    #[test]
    fn test_config_not_found() {
        let result = TestConfig::load("/nonexistent/path.json5");
        assert!(matches!(result, Err(PublisherError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{ broker: {{ host: "rabbitmq", queue: "q_file" }}, publish: {{ interval_ms: 750 }} }}"#
        )
        .unwrap();

        let config = TestConfig::load(file.path()).unwrap();
        assert_eq!(config.broker.host, "rabbitmq");
        assert_eq!(config.broker.queue, "q_file");
        assert_eq!(config.publish.interval(), Duration::from_millis(750));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ broker: ").unwrap();

        let result = TestConfig::load(file.path());
        assert!(matches!(result, Err(PublisherError::ConfigParse(_))));
    }

    #[test]
    fn test_complete_config_is_valid() {
        let config = complete();
        config.validate().unwrap();

        let topology = config.topology();
        assert_eq!(topology.exchange, "e_metrics");
        assert_eq!(topology.queue, "q_metrics");
        assert_eq!(topology.routing_key, "metrics");
        assert_eq!(config.publish.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_missing_variable_is_named() {
        let mut config = complete();
        config.broker.queue.clear();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, PublisherError::ConfigValidation(_)));
        assert!(err.to_string().contains("RABBITMQ_QUEUE"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = complete();
        config.publish.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_without_file_uses_defaults() {
        let args = PublisherArgs {
            host: Some("rabbitmq".to_string()),
            ..PublisherArgs::default()
        };

        let config = TestConfig::resolve(&args).unwrap();
        assert_eq!(config.broker.host, "rabbitmq");
        assert_eq!(config.broker.port, 5672);
        assert_eq!(config.publish.exchange, "e_metrics");
    }

    #[test]
    fn test_parse_publish_section() {
        let config: TestConfig = fleetmon_common::parse_config(
            r#"{
                publish: { exchange: "e_fleet", routing_key: "fleet", durable: true, interval_ms: 250 }
            }"#,
        )
        .unwrap();

        let topology = config.topology();
        assert_eq!(topology.exchange, "e_fleet");
        assert_eq!(topology.routing_key, "fleet");
        assert!(topology.durable);
        assert_eq!(config.publish.interval(), Duration::from_millis(250));
    }
}
