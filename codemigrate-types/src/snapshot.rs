//! Connection-free projection of the active database configuration.
//!
//! The parent process encodes a [`ConfigSnapshot`] and the generated driver
//! program decodes it. The two sides may be built from different source
//! trees, so the encoding is field-tagged JSON: field order does not matter,
//! unknown fields are ignored, and only a missing or mistyped field (or an
//! unknown `format`) is treated as malformed.

use crate::schema::SNAPSHOT_V1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything a child process needs to reconnect to the target database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Driver (dialect) name, e.g. `postgres`.
    pub driver: String,
    /// Connection string handed to the driver.
    pub open: String,
    /// Runtime backend feature the driver program is compiled with.
    pub import: String,
    /// Logical environment name (`development`, `production`, ...).
    pub env: String,
    pub migrations_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode config snapshot: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("malformed config snapshot: {message}")]
    Malformed { message: String },
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format: &'static str,
    #[serde(flatten)]
    snapshot: &'a ConfigSnapshot,
}

#[derive(Deserialize)]
struct Envelope {
    format: String,
    #[serde(flatten)]
    snapshot: ConfigSnapshot,
}

/// Encode a snapshot. Output is deterministic for a fixed input.
pub fn encode_snapshot(snapshot: &ConfigSnapshot) -> Result<Vec<u8>, SnapshotError> {
    let envelope = EnvelopeRef {
        format: SNAPSHOT_V1,
        snapshot,
    };
    serde_json::to_vec(&envelope).map_err(SnapshotError::Encoding)
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<ConfigSnapshot, SnapshotError> {
    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(|e| SnapshotError::Malformed {
            message: e.to_string(),
        })?;

    if envelope.format != SNAPSHOT_V1 {
        return Err(SnapshotError::Malformed {
            message: format!(
                "unsupported format '{}' (expected '{}')",
                envelope.format, SNAPSHOT_V1
            ),
        });
    }

    Ok(envelope.snapshot)
}
