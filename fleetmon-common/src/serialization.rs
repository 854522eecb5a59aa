use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};
use crate::metrics::MachineMetricSample;

/// MIME type of published payloads.
pub const CONTENT_TYPE: &str = "application/json";

/// Encode a value to JSON bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(Error::from)
}

/// Decode JSON bytes to a value.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(Error::from)
}

/// Encode a metric sample into its wire payload.
///
/// Fails with [`Error::NonFiniteValue`] instead of emitting `null` for NaN
/// or infinite readings.
pub fn encode_sample(sample: &MachineMetricSample) -> Result<Vec<u8>> {
    sample.ensure_finite()?;
    encode(sample)
}
