//! Machine metric sample and its wire representation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Geographic position of a machine.
///
/// Each component is a numeric value followed by a hemisphere suffix,
/// e.g. `"51.3 N"` or `"0.2 W"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
}

impl Coordinates {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }
}

/// One telemetry sample emitted by a simulated machine.
///
/// Immutable once built. `mem_usage_bytes` is derived from the memory
/// fraction in [`MachineMetricSample::new`] and cannot be set on its own.
///
/// Serializes to a [`MetricMessage`]. Received payloads decode into
/// [`MetricMessage`] only, never back into a sample:
///
/// ```compile_fail
/// use fleetmon_common::{MachineMetricSample, decode};
///
/// let _: MachineMetricSample = decode(b"{}").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "MetricMessage")]
pub struct MachineMetricSample {
    machine_name: String,
    coordinates: Coordinates,
    cpu_usage_fraction: f64,
    mem_usage_fraction: f64,
    mem_usage_bytes: u64,
    temperature_celsius: f64,
}

impl MachineMetricSample {
    /// Build a sample, deriving `mem_usage_bytes` as
    /// `floor(mem_usage_fraction * total_memory_bytes)`.
    pub fn new(
        machine_name: impl Into<String>,
        coordinates: Coordinates,
        cpu_usage_fraction: f64,
        mem_usage_fraction: f64,
        temperature_celsius: f64,
        total_memory_bytes: u64,
    ) -> Self {
        Self {
            machine_name: machine_name.into(),
            coordinates,
            cpu_usage_fraction,
            mem_usage_fraction,
            mem_usage_bytes: mem_usage_bytes(mem_usage_fraction, total_memory_bytes),
            temperature_celsius,
        }
    }

    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    pub fn cpu_usage_fraction(&self) -> f64 {
        self.cpu_usage_fraction
    }

    pub fn mem_usage_fraction(&self) -> f64 {
        self.mem_usage_fraction
    }

    pub fn mem_usage_bytes(&self) -> u64 {
        self.mem_usage_bytes
    }

    pub fn temperature_celsius(&self) -> f64 {
        self.temperature_celsius
    }

    /// Reject NaN and infinities before the sample goes on the wire.
    ///
    /// `serde_json` would otherwise write them as `null`.
    pub fn ensure_finite(&self) -> Result<()> {
        let fields = [
            ("cpu_usage_porc", self.cpu_usage_fraction),
            ("mem_usage_porc", self.mem_usage_fraction),
            ("temperature", self.temperature_celsius),
        ];

        for (field, value) in fields {
            if !value.is_finite() {
                return Err(Error::NonFiniteValue { field });
            }
        }

        Ok(())
    }
}

/// Memory in use for a given fraction of the total, rounded down.
pub fn mem_usage_bytes(fraction: f64, total_memory_bytes: u64) -> u64 {
    (fraction * total_memory_bytes as f64).floor() as u64
}

/// Wire envelope published to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMessage {
    pub metadata: Metadata,
    pub metrics: Metrics,
}

/// Identity of the emitting machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
}

/// Measured values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub coordinates: Coordinates,
    pub cpu_usage_porc: f64,
    pub mem_usage_porc: f64,
    pub mem_usage_bytes: u64,
    pub temperature: f64,
}

impl From<MachineMetricSample> for MetricMessage {
    fn from(sample: MachineMetricSample) -> Self {
        Self {
            metadata: Metadata {
                name: sample.machine_name,
            },
            metrics: Metrics {
                coordinates: sample.coordinates,
                cpu_usage_porc: sample.cpu_usage_fraction,
                mem_usage_porc: sample.mem_usage_fraction,
                mem_usage_bytes: sample.mem_usage_bytes,
                temperature: sample.temperature_celsius,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MachineMetricSample {
        MachineMetricSample::new(
            "machine_01",
            Coordinates::new("51.3 N", "0.1 W"),
            0.7,
            0.5,
            40.3,
            1_048_576,
        )
    }

    #[test]
    fn test_mem_usage_bytes_is_derived() {
        let sample = sample();
        assert_eq!(sample.mem_usage_bytes(), 524_288);
    }

    #[test]
    fn test_mem_usage_bytes_rounds_down() {
        assert_eq!(mem_usage_bytes(0.3, 10), 3);
        assert_eq!(mem_usage_bytes(0.999, 1000), 999);
        assert_eq!(mem_usage_bytes(1.0, 8_589_934_592), 8_589_934_592);
    }

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(sample()).unwrap();

        assert_eq!(value["metadata"]["name"], "machine_01");
        assert_eq!(value["metrics"]["coordinates"]["latitude"], "51.3 N");
        assert_eq!(value["metrics"]["coordinates"]["longitude"], "0.1 W");
        assert_eq!(value["metrics"]["cpu_usage_porc"], 0.7);
        assert_eq!(value["metrics"]["mem_usage_porc"], 0.5);
        assert_eq!(value["metrics"]["mem_usage_bytes"], 524_288);
        assert_eq!(value["metrics"]["temperature"], 40.3);
        assert_eq!(value.as_object().unwrap().len(), 2);
        assert_eq!(value["metrics"].as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_message_carries_derived_bytes() {
        let message = MetricMessage::from(sample());

        assert_eq!(message.metadata.name, "machine_01");
        assert_eq!(message.metrics.mem_usage_porc, 0.5);
        assert_eq!(message.metrics.mem_usage_bytes, 524_288);
    }

    #[test]
    fn test_ensure_finite() {
        assert!(sample().ensure_finite().is_ok());

        let bad = MachineMetricSample::new(
            "machine_01",
            Coordinates::new("0.0 N", "0.0 E"),
            f64::NAN,
            0.5,
            45.0,
            1024,
        );
        assert!(matches!(
            bad.ensure_finite(),
            Err(Error::NonFiniteValue {
                field: "cpu_usage_porc"
            })
        ));

        let hot = MachineMetricSample::new(
            "machine_01",
            Coordinates::new("0.0 N", "0.0 E"),
            0.5,
            0.5,
            f64::INFINITY,
            1024,
        );
        assert!(matches!(
            hot.ensure_finite(),
            Err(Error::NonFiniteValue {
                field: "temperature"
            })
        ));
    }
}
