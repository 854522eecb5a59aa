//! CLI and environment arguments shared by publishers.

use std::path::PathBuf;

use clap::Args;

use crate::config::PublisherConfig;

/// Broker and loop settings taken from the command line or the environment.
///
/// Every value is optional here; whatever is set overrides the config file.
/// Required settings are checked afterwards by
/// [`PublisherConfig::validate`].
#[derive(Args, Debug, Clone, Default)]
pub struct PublisherArgs {
    /// Path to an optional JSON5 configuration file.
    #[arg(short, long, env = "FLEETMON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Broker host.
    #[arg(long, env = "RABBITMQ_HOST")]
    pub host: Option<String>,

    /// Broker port.
    #[arg(long, env = "RABBITMQ_PORT")]
    pub port: Option<u16>,

    /// Broker username.
    #[arg(long, env = "RABBITMQ_USERNAME")]
    pub username: Option<String>,

    /// Broker password.
    #[arg(long, env = "RABBITMQ_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Broker virtual host.
    #[arg(long, env = "RABBITMQ_VHOST")]
    pub vhost: Option<String>,

    /// Queue bound to the metrics exchange.
    #[arg(long, env = "RABBITMQ_QUEUE")]
    pub queue: Option<String>,

    /// Exchange receiving the metrics.
    #[arg(long, env = "RABBITMQ_EXCHANGE")]
    pub exchange: Option<String>,

    /// Milliseconds between two published samples.
    #[arg(long, env = "PUBLISH_INTERVAL_MS")]
    pub interval_ms: Option<u64>,
}

impl PublisherArgs {
    /// Overlay every value that was set onto `config`.
    pub fn apply<C: PublisherConfig>(&self, config: &mut C) {
        let broker = config.broker_mut();
        if let Some(ref host) = self.host {
            broker.host = host.clone();
        }
        if let Some(port) = self.port {
            broker.port = port;
        }
        if let Some(ref username) = self.username {
            broker.username = username.clone();
        }
        if let Some(ref password) = self.password {
            broker.password = password.clone();
        }
        if let Some(ref vhost) = self.vhost {
            broker.vhost = vhost.clone();
        }
        if let Some(ref queue) = self.queue {
            broker.queue = queue.clone();
        }

        let publish = config.publish_mut();
        if let Some(ref exchange) = self.exchange {
            publish.exchange = exchange.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            publish.interval_ms = interval_ms;
        }

        if let Some(ref level) = self.log_level {
            config.logging_mut().level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::TestConfig;

    #[test]
    fn test_apply_overrides_only_set_values() {
        let mut config = TestConfig::default();
        config.broker.host = "from-file".to_string();
        config.broker.queue = "q_file".to_string();

        let args = PublisherArgs {
            host: Some("rabbitmq".to_string()),
            port: Some(5673),
            interval_ms: Some(250),
            log_level: Some("debug".to_string()),
            ..PublisherArgs::default()
        };
        args.apply(&mut config);

        assert_eq!(config.broker.host, "rabbitmq");
        assert_eq!(config.broker.port, 5673);
        assert_eq!(config.broker.queue, "q_file");
        assert_eq!(config.publish.interval_ms, 250);
        assert_eq!(config.publish.exchange, "e_metrics");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_flags() {
        use clap::Parser;

        #[derive(Parser)]
        struct Cli {
            #[command(flatten)]
            publisher: PublisherArgs,
        }

        let cli = Cli::parse_from([
            "fleetmon",
            "--host",
            "broker.local",
            "--queue",
            "q_metrics",
            "--interval-ms",
            "1000",
        ]);

        assert_eq!(cli.publisher.host.as_deref(), Some("broker.local"));
        assert_eq!(cli.publisher.queue.as_deref(), Some("q_metrics"));
        assert_eq!(cli.publisher.interval_ms, Some(1000));
    }
}
