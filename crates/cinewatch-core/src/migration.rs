use cinewatch_models::HistoryState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Schema version written alongside the persisted state
pub const CURRENT_VERSION: u32 = 1;

#[derive(Serialize)]
struct Envelope<'a> {
    state: &'a HistoryState,
    version: u32,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    state: Option<Value>,
    #[serde(default)]
    version: u32,
}

/// Bring a persisted state written by `from_version` up to `CURRENT_VERSION`.
///
/// Version 0 and version 1 share the same layout, so every arm passes the
/// state through untouched. New schema changes add an arm here.
pub fn migrate(state: Value, from_version: u32) -> Value {
    match from_version {
        0 => state,
        CURRENT_VERSION => state,
        newer => {
            warn!(
                "History was written by schema version {} (current is {}), decoding as-is",
                newer, CURRENT_VERSION
            );
            state
        }
    }
}

/// Wrap the state in the versioned envelope
pub fn encode(state: &HistoryState) -> Result<Value, serde_json::Error> {
    serde_json::to_value(Envelope {
        state,
        version: CURRENT_VERSION,
    })
}

/// Unwrap a versioned envelope, migrating older layouts first
pub fn decode(value: Value) -> Result<HistoryState, serde_json::Error> {
    let raw: RawEnvelope = serde_json::from_value(value)?;
    let Some(state) = raw.state else {
        return Ok(HistoryState::default());
    };

    let state = if raw.version == CURRENT_VERSION {
        state
    } else {
        debug!("Migrating history from version {} to {}", raw.version, CURRENT_VERSION);
        migrate(state, raw.version)
    };

    serde_json::from_value(state)
}
