// src/io/snapshot.rs

use crate::model::state::SimulationState;
use crate::simulation::config::{safe_number, SimulationParams};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SNAPSHOT_KEY: &str = "supply-chain-sim";
pub const SNAPSHOT_VERSION: u32 = 1;

/// The persisted form of a session: the state plus what it must match on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub key: String,
    pub version: u32,
    pub reset_token: u64,
    pub state: Value,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("snapshot belongs to {found:?}, expected {expected:?}")]
    WrongKey { found: String, expected: &'static str },
    #[error("snapshot version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("snapshot reset token {found} does not match current token {expected}")]
    StaleToken { found: u64, expected: u64 },
    #[error("snapshot state must be a JSON object")]
    NotAnObject,
    #[error("snapshot store I/O failed on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn encode(state: &SimulationState, reset_token: u64) -> Result<String, SnapshotError> {
    let envelope = SnapshotEnvelope {
        key: SNAPSHOT_KEY.to_string(),
        version: SNAPSHOT_VERSION,
        reset_token,
        state: serde_json::to_value(state)?,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Validates a stored snapshot and rebuilds the state from it.
///
/// Fields missing from the stored state keep the values of a fresh initial
/// state; the result is sanitized before it is handed back.
pub fn decode(
    text: &str,
    expected_token: u64,
    params: &SimulationParams,
) -> Result<SimulationState, SnapshotError> {
    let envelope: SnapshotEnvelope = serde_json::from_str(text)?;
    if envelope.key != SNAPSHOT_KEY {
        return Err(SnapshotError::WrongKey {
            found: envelope.key,
            expected: SNAPSHOT_KEY,
        });
    }
    if envelope.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::Version {
            found: envelope.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    if envelope.reset_token != expected_token {
        return Err(SnapshotError::StaleToken {
            found: envelope.reset_token,
            expected: expected_token,
        });
    }
    let Value::Object(saved) = envelope.state else {
        return Err(SnapshotError::NotAnObject);
    };

    let mut merged = serde_json::to_value(SimulationState::initial(params))?;
    overlay(&mut merged, Value::Object(saved));
    let mut state: SimulationState = serde_json::from_value(merged)?;
    state.sanitize();
    Ok(state)
}

/// Writes `saved` over `base` field by field, descending into nested records.
///
/// A null keeps the base value, a number field that does not hold a number
/// becomes zero, and any other type mismatch keeps the base value. A tagged
/// record whose `phase` differs from the base is taken whole.
fn overlay(base: &mut Value, saved: Value) {
    match saved {
        Value::Null => {}
        Value::Object(fields) => match base {
            Value::Object(target) if same_phase(target, &fields) => {
                for (field, value) in fields {
                    match target.get_mut(&field) {
                        Some(slot) => overlay(slot, value),
                        None => {
                            target.insert(field, value);
                        }
                    }
                }
            }
            Value::Object(_) => *base = Value::Object(fields),
            _ => {}
        },
        other if base.is_number() => *base = coerce_number(base, &other),
        other if mem::discriminant(&*base) == mem::discriminant(&other) => *base = other,
        _ => {}
    }
}

fn same_phase(base: &Map<String, Value>, saved: &Map<String, Value>) -> bool {
    match (base.get("phase"), saved.get("phase")) {
        (Some(ours), Some(theirs)) => ours == theirs,
        _ => true,
    }
}

fn coerce_number(current: &Value, saved: &Value) -> Value {
    if current.is_f64() {
        return Value::from(safe_number(Some(saved), 0.0));
    }
    if saved.is_i64() || saved.is_u64() {
        return saved.clone();
    }
    let whole = safe_number(Some(saved), 0.0).trunc();
    if whole < 0.0 {
        Value::from(whole as i64)
    } else {
        Value::from(whole as u64)
    }
}

/// Somewhere a session can park its serialized snapshot between intervals.
pub trait SnapshotStore {
    fn load(&self) -> Result<Option<String>, SnapshotError>;
    fn save(&mut self, snapshot: String) -> Result<(), SnapshotError>;
    fn clear(&mut self) -> Result<(), SnapshotError>;
}

/// Single in-memory slot, the headless stand-in for a browser tab's name field.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    slot: Option<String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(snapshot: impl Into<String>) -> Self {
        Self {
            slot: Some(snapshot.into()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.slot.as_deref()
    }
}

impl SnapshotStore for MemorySlot {
    fn load(&self) -> Result<Option<String>, SnapshotError> {
        Ok(self.slot.clone())
    }

    fn save(&mut self, snapshot: String) -> Result<(), SnapshotError> {
        self.slot = Some(snapshot);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SnapshotError> {
        self.slot = None;
        Ok(())
    }
}

/// Snapshot kept in a single file so a later run can pick up where this one stopped.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileSlot {
    fn load(&self) -> Result<Option<String>, SnapshotError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn save(&mut self, snapshot: String) -> Result<(), SnapshotError> {
        fs::write(&self.path, snapshot).map_err(|err| self.io_error(err))
    }

    fn clear(&mut self) -> Result<(), SnapshotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::vehicles::SupplyTruck;
    use serde_json::json;

    fn sample_state(params: &SimulationParams) -> SimulationState {
        let mut state = SimulationState::initial(params);
        state.factory_stock = 123.5;
        state.backlog = 7.25;
        state.score = -42;
        state.truck = SupplyTruck::dispatch(160.0, 6.0, 0.002);
        state
    }

    #[test]
    fn round_trip_restores_state() {
        let params = SimulationParams::default();
        let state = sample_state(&params);
        let text = encode(&state, 3).unwrap();
        let restored = decode(&text, 3, &params).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn stale_token_is_rejected() {
        let params = SimulationParams::default();
        let text = encode(&sample_state(&params), 3).unwrap();
        assert!(matches!(
            decode(&text, 4, &params),
            Err(SnapshotError::StaleToken {
                found: 3,
                expected: 4
            })
        ));
    }

    #[test]
    fn foreign_and_future_envelopes_are_rejected() {
        let params = SimulationParams::default();
        let foreign = json!({ "key": "other", "version": 1, "reset_token": 0, "state": {} });
        assert!(matches!(
            decode(&foreign.to_string(), 0, &params),
            Err(SnapshotError::WrongKey { .. })
        ));

        let future = json!({ "key": SNAPSHOT_KEY, "version": 9, "reset_token": 0, "state": {} });
        assert!(matches!(
            decode(&future.to_string(), 0, &params),
            Err(SnapshotError::Version { found: 9, .. })
        ));

        assert!(matches!(
            decode("not json", 0, &params),
            Err(SnapshotError::Parse(_))
        ));
    }

    #[test]
    fn partial_state_is_filled_from_initial() {
        let params = SimulationParams::default();
        let partial = json!({
            "key": SNAPSHOT_KEY,
            "version": SNAPSHOT_VERSION,
            "reset_token": 0,
            "state": { "factory_stock": 55.0, "backlog": -3.0 }
        });
        let state = decode(&partial.to_string(), 0, &params).unwrap();
        assert_eq!(state.factory_stock, 55.0);
        assert_eq!(state.backlog, 0.0);
        assert_eq!(state.warehouse_stock, 520.0);
        assert_eq!(state.finished_goods_stock, params.initial_fg_stock);
    }

    #[test]
    fn nested_records_and_nulls_are_filled_from_initial() {
        let params = SimulationParams::default();
        let initial = SimulationState::initial(&params);
        let partial = json!({
            "key": SNAPSHOT_KEY,
            "version": SNAPSHOT_VERSION,
            "reset_token": 0,
            "state": {
                "factory_stock": 55.0,
                "backlog": null,
                "warehouse_stock": "310",
                "finished_goods_stock": "lots",
                "score": -4,
                "production_shutdown": "yes",
                "worker": { "progress": 0.5 },
                "ledger": { "delivered": 160.0, "trucks_arrived": 1 }
            }
        });
        let state = decode(&partial.to_string(), 0, &params).unwrap();
        assert_eq!(state.factory_stock, 55.0);
        assert_eq!(state.backlog, initial.backlog);
        assert_eq!(state.warehouse_stock, 310.0);
        assert_eq!(state.finished_goods_stock, 0.0);
        assert_eq!(state.score, -4);
        assert_eq!(state.production_shutdown, initial.production_shutdown);

        assert_eq!(state.worker.progress, 0.5);
        assert_eq!(state.worker.direction, initial.worker.direction);
        assert_eq!(state.worker.load, initial.worker.load);

        assert_eq!(state.ledger.delivered, 160.0);
        assert_eq!(state.ledger.trucks_arrived, 1);
        assert_eq!(state.ledger.produced, initial.ledger.produced);
        assert_eq!(state.retail_van, initial.retail_van);
    }

    #[test]
    fn truck_in_another_phase_is_taken_whole() {
        let params = SimulationParams::default();
        let mut state = SimulationState::initial(&params);
        state.truck = SupplyTruck::dispatch(200.0, 3.0, 0.002);
        let saved = serde_json::to_value(&state).unwrap();
        let envelope = json!({
            "key": SNAPSHOT_KEY,
            "version": SNAPSHOT_VERSION,
            "reset_token": 0,
            "state": { "truck": saved["truck"].clone() }
        });
        let restored = decode(&envelope.to_string(), 0, &params).unwrap();
        assert_eq!(restored.truck, state.truck);
    }

    #[test]
    fn file_slot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut slot = FileSlot::new(dir.path().join("session.json"));
        assert_eq!(slot.path(), dir.path().join("session.json"));
        assert_eq!(slot.load().unwrap(), None);

        slot.save("hello".to_string()).unwrap();
        assert_eq!(slot.load().unwrap().as_deref(), Some("hello"));

        slot.clear().unwrap();
        assert_eq!(slot.load().unwrap(), None);
        slot.clear().unwrap();
    }
}
