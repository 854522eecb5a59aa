//! Simulated machine metrics.

use std::ops::RangeInclusive;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use fleetmon_common::{Coordinates, MachineMetricSample};
use fleetmon_publisher::SampleSource;

/// Memory size of the simulated machine (8 GiB).
pub const DEFAULT_TOTAL_MEMORY_BYTES: u64 = 8 * 1024 * 1024 * 1024;

/// Range of CPU and memory usage fractions.
pub const USAGE_RANGE: RangeInclusive<f64> = 0.1..=1.0;

/// Range of sensor temperatures in degrees Celsius.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 40.0..=60.0;

pub const LATITUDE_RANGE: RangeInclusive<f64> = -90.0..=90.0;

pub const LONGITUDE_RANGE: RangeInclusive<f64> = -180.0..=180.0;

/// How the hemisphere suffix of a coordinate is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HemispherePolicy {
    /// Absolute value, suffixed N/S or E/W according to the sign.
    #[default]
    Sign,
    /// Signed value, always suffixed "N" for latitude and "W" for longitude.
    /// Matches what older publishers in the fleet emit.
    Fixed,
}

impl HemispherePolicy {
    /// Format a latitude in degrees.
    pub fn latitude(self, degrees: f64) -> String {
        self.format(degrees, 'N', 'S', 'N')
    }

    /// Format a longitude in degrees.
    pub fn longitude(self, degrees: f64) -> String {
        self.format(degrees, 'E', 'W', 'W')
    }

    fn format(self, degrees: f64, positive: char, negative: char, fixed: char) -> String {
        match self {
            HemispherePolicy::Sign => {
                let suffix = if degrees >= 0.0 { positive } else { negative };
                format!("{:.1} {}", degrees.abs(), suffix)
            }
            HemispherePolicy::Fixed => format!("{:.1} {}", degrees, fixed),
        }
    }
}

/// Draws a fresh [`MachineMetricSample`] for every tick.
///
/// CPU and memory fractions are uniform in [`USAGE_RANGE`], temperature in
/// [`TEMPERATURE_RANGE`], coordinates over the whole globe.
pub struct MetricSampler {
    rng: SmallRng,
    machine_name: String,
    total_memory_bytes: u64,
    hemisphere: HemispherePolicy,
}

impl MetricSampler {
    /// Create a sampler seeded from the operating system.
    pub fn new(machine_name: impl Into<String>, total_memory_bytes: u64) -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
            machine_name: machine_name.into(),
            total_memory_bytes,
            hemisphere: HemispherePolicy::default(),
        }
    }

    /// Use a fixed seed so the sample sequence is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn with_hemisphere(mut self, hemisphere: HemispherePolicy) -> Self {
        self.hemisphere = hemisphere;
        self
    }

    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    pub fn total_memory_bytes(&self) -> u64 {
        self.total_memory_bytes
    }

    /// Draw the next sample.
    pub fn sample(&mut self) -> MachineMetricSample {
        let cpu = self.rng.random_range(USAGE_RANGE);
        let mem = self.rng.random_range(USAGE_RANGE);
        let temperature = self.rng.random_range(TEMPERATURE_RANGE);
        let latitude = self.rng.random_range(LATITUDE_RANGE);
        let longitude = self.rng.random_range(LONGITUDE_RANGE);

        MachineMetricSample::new(
            self.machine_name.clone(),
            Coordinates::new(
                self.hemisphere.latitude(latitude),
                self.hemisphere.longitude(longitude),
            ),
            cpu,
            mem,
            temperature,
            self.total_memory_bytes,
        )
    }
}

impl SampleSource for MetricSampler {
    fn next_sample(&mut self) -> MachineMetricSample {
        self.sample()
    }
}

/// Split a formatted coordinate into its value and suffix.
pub fn parse_coordinate(coordinate: &str) -> Option<(f64, char)> {
    let (value, suffix) = coordinate.split_once(' ')?;
    let mut chars = suffix.chars();
    let suffix = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some((value.parse().ok()?, suffix))
}
