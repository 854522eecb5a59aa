//! Simulated machine agent for fleet monitoring.
//!
//! Each agent plays one machine of the fleet: every tick it draws a
//! [`MachineMetricSample`](fleetmon_common::MachineMetricSample) and
//! publishes it as JSON to the metrics exchange.
//!
//! # Wire Format
//!
//! ```text
//! {
//!   "metadata": { "name": "<machine>" },
//!   "metrics": {
//!     "coordinates": { "latitude": "51.3 N", "longitude": "0.1 W" },
//!     "cpu_usage_porc": 0.42,
//!     "mem_usage_porc": 0.5,
//!     "mem_usage_bytes": 4294967296,
//!     "temperature": 47.1
//!   }
//! }
//! ```

pub mod config;
pub mod sampler;
