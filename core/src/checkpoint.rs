// Versioned flat checkpoint records.
//
// A record carries the full serialized state of one accumulator instance
// (configuration, every level's buffer, sums and counts, tick counters),
// enough to resume `update` exactly where it left off.
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AccumulatorError;

pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointRecord<S> {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub state: S,
}

/// Serialize an accumulator state into a versioned JSON record.
pub fn save<S: Serialize>(state: &S) -> Result<String, AccumulatorError> {
    let record = CheckpointRecord {
        version: CHECKPOINT_VERSION,
        created_at: Utc::now(),
        state,
    };
    Ok(serde_json::to_string(&record)?)
}

/// Restore an accumulator state from a record written by `save`.
pub fn load<S: DeserializeOwned>(json: &str) -> Result<S, AccumulatorError> {
    let record: CheckpointRecord<S> = serde_json::from_str(json)?;
    if record.version != CHECKPOINT_VERSION {
        return Err(AccumulatorError::Checkpoint {
            message: format!(
                "unsupported checkpoint version {} (expected {})",
                record.version, CHECKPOINT_VERSION
            ),
        });
    }
    Ok(record.state)
}
