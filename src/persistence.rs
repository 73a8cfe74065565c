//! Persistence of estimator state across restarts
//!
//! The estimator only ever sees a [`PersistencePort`]. Records are flat
//! `{soc_percent, capacity_mah, q_remaining_mah, soc_valid}` values addressed
//! by the pack's instance key.

use crate::error::{GaugeError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::soc::{SocEstimator, SocOutputs};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The persisted subset of estimator state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PersistedState {
    pub soc_percent: Option<f64>,
    pub capacity_mah: Option<f64>,
    pub q_remaining_mah: Option<f64>,
    pub soc_valid: bool,
    /// When the record was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl PersistedState {
    /// Snapshot the persisted fields of an output record
    pub fn from_outputs(outputs: &SocOutputs) -> Self {
        Self {
            soc_percent: outputs.soc_percent,
            capacity_mah: outputs.capacity_mah,
            q_remaining_mah: outputs.q_remaining_mah,
            soc_valid: outputs.soc_valid,
            saved_at: Some(Utc::now()),
        }
    }

    /// Reject records that could not have been produced by a healthy estimator
    pub fn validate(&self) -> Result<()> {
        if let Some(cap) = self.capacity_mah
            && !(cap.is_finite() && cap > 0.0)
        {
            return Err(GaugeError::persistence(format!(
                "stored capacity {} is not a positive number",
                cap
            )));
        }
        if let Some(q) = self.q_remaining_mah
            && !(q.is_finite() && q >= 0.0)
        {
            return Err(GaugeError::persistence(format!(
                "stored remaining charge {} is not a non-negative number",
                q
            )));
        }
        if self.soc_valid {
            match self.soc_percent {
                Some(soc) if soc.is_finite() && (0.0..=100.0).contains(&soc) => {}
                Some(soc) => {
                    return Err(GaugeError::persistence(format!(
                        "stored SoC {} is outside [0, 100]",
                        soc
                    )));
                }
                None => {
                    return Err(GaugeError::persistence(
                        "stored SoC is marked valid but missing",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Restore the record into an estimator. Remaining charge is clamped to
    /// the capacity; SoC is only taken when it was valid.
    pub fn apply_to(&self, estimator: &mut SocEstimator) {
        estimator.set_capacity_mah(self.capacity_mah);
        estimator.set_q_remaining_mah(self.q_remaining_mah);
        if self.soc_valid {
            estimator.set_soc_percent(self.soc_percent);
        } else {
            estimator.set_soc_percent(None);
        }
    }
}

/// Storage boundary for estimator state
pub trait PersistencePort: Send {
    /// Fetch the record stored under `key`, `Ok(None)` when there is none
    fn load(&self, key: &str) -> Result<Option<PersistedState>>;

    /// Store `state` under `key`
    fn save(&mut self, key: &str, state: &PersistedState) -> Result<()>;
}

/// One pretty-printed JSON file mapping instance keys to records
pub struct JsonFileStore {
    path: PathBuf,
    logger: StructuredLogger,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            logger: get_logger("persistence"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Option<BTreeMap<String, PersistedState>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let records = serde_json::from_str(&contents).map_err(|e| {
            GaugeError::persistence(format!(
                "Corrupt state file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(records))
    }

    fn write_all(&self, records: &BTreeMap<String, PersistedState>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PersistencePort for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<PersistedState>> {
        let Some(mut records) = self.read_all()? else {
            self.logger.info("No state file found");
            return Ok(None);
        };
        Ok(records.remove(key))
    }

    fn save(&mut self, key: &str, state: &PersistedState) -> Result<()> {
        // Records of other packs survive; an unreadable file is replaced
        let mut records = match self.read_all() {
            Ok(existing) => existing.unwrap_or_default(),
            Err(e) => {
                self.logger
                    .warn(&format!("Overwriting unreadable state file: {}", e));
                BTreeMap::new()
            }
        };
        records.insert(key.to_string(), *state);
        self.write_all(&records)?;
        self.logger
            .debug(&format!("Saved state for {} to {}", key, self.path.display()));
        Ok(())
    }
}

/// Process-local store; state is lost on exit
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<String, PersistedState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(key: &str, state: PersistedState) -> Self {
        let mut store = Self::new();
        store.records.insert(key.to_string(), state);
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PersistencePort for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<PersistedState>> {
        Ok(self.records.get(key).copied())
    }

    fn save(&mut self, key: &str, state: &PersistedState) -> Result<()> {
        self.records.insert(key.to_string(), *state);
        Ok(())
    }
}

/// Build the port described by the configuration
pub fn open_store(state_file: Option<&str>) -> Box<dyn PersistencePort> {
    match state_file {
        Some(path) if !path.trim().is_empty() => Box::new(JsonFileStore::new(path)),
        _ => Box::new(MemoryStore::new()),
    }
}
