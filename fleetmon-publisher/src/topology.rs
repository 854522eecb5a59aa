//! Broker topology: one direct exchange, one queue, one binding.

use std::collections::HashSet;

/// Default exchange for machine metrics.
pub const DEFAULT_EXCHANGE: &str = "e_metrics";

/// Default routing key binding the queue to the exchange.
pub const DEFAULT_ROUTING_KEY: &str = "metrics";

/// Exchange, queue and binding declared at session start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topology {
    /// Direct exchange name.
    pub exchange: String,
    /// Queue name.
    pub queue: String,
    /// Routing key of the queue binding.
    pub routing_key: String,
    /// Declare exchange and queue as durable.
    pub durable: bool,
}

impl Topology {
    /// Topology with the default exchange and routing key.
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            queue: queue.into(),
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            durable: false,
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    pub fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// The `(queue, exchange, routing_key)` binding this topology creates.
    pub fn binding(&self) -> Binding {
        Binding {
            queue: self.queue.clone(),
            exchange: self.exchange.clone(),
            routing_key: self.routing_key.clone(),
        }
    }
}

/// Queue-to-exchange binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
}

/// Topologies a session has already declared.
///
/// Redeclaring an identical topology is a no-op and never adds a second
/// binding.
#[derive(Debug, Default)]
pub struct DeclaredTopologies {
    topologies: HashSet<Topology>,
    bindings: HashSet<Binding>,
}

impl DeclaredTopologies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `topology` still has to be sent to the broker.
    pub fn needs_declare(&self, topology: &Topology) -> bool {
        !self.topologies.contains(topology)
    }

    /// Record a successful declaration. Returns `false` if it was already known.
    pub fn record(&mut self, topology: &Topology) -> bool {
        self.bindings.insert(topology.binding());
        self.topologies.insert(topology.clone())
    }

    /// Distinct bindings declared so far.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_defaults() {
        let topology = Topology::new("q_metrics");
        assert_eq!(topology.exchange, "e_metrics");
        assert_eq!(topology.routing_key, "metrics");
        assert_eq!(topology.queue, "q_metrics");
        assert!(!topology.durable);
    }

    #[test]
    fn test_declare_twice_is_idempotent() {
        let mut declared = DeclaredTopologies::new();
        let topology = Topology::new("q_metrics");

        assert!(declared.needs_declare(&topology));
        assert!(declared.record(&topology));

        assert!(!declared.needs_declare(&topology));
        assert!(!declared.record(&topology));
        assert_eq!(declared.binding_count(), 1);
    }

    #[test]
    fn test_durability_change_redeclares_same_binding() {
        let mut declared = DeclaredTopologies::new();
        let transient = Topology::new("q_metrics");
        let durable = transient.clone().with_durable(true);

        declared.record(&transient);
        assert!(declared.needs_declare(&durable));
        declared.record(&durable);

        assert_eq!(declared.binding_count(), 1);
    }

    #[test]
    fn test_distinct_routing_keys_are_distinct_bindings() {
        let mut declared = DeclaredTopologies::new();
        declared.record(&Topology::new("q_metrics"));
        declared.record(&Topology::new("q_metrics").with_routing_key("alerts"));

        assert_eq!(declared.binding_count(), 2);
        assert!(declared.bindings().any(|b| b.routing_key == "alerts"));
    }
}
