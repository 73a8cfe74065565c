//! State store: the estimator plus its persistence schedule
//!
//! Restores state on construction, saves on a fixed interval and right after
//! every manual override. Persistence is best-effort: failures are logged and
//! counted, in-memory state is never touched by them.

use crate::config::EstimatorConfig;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::persistence::{PersistedState, PersistencePort};
use crate::soc::{SocEstimator, SocInputs, SocOutputs};
use std::time::{Duration, Instant};

/// How the store came up
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupState {
    /// A stored record was restored
    Restored,
    /// Nothing stored for this key
    Fresh,
    /// A stored record existed but could not be used
    Recovered,
}

pub struct GaugeStore {
    estimator: SocEstimator,
    port: Box<dyn PersistencePort>,
    key: String,
    save_interval: Duration,
    last_save: Option<Instant>,
    save_failures: u64,
    startup: StartupState,
    logger: StructuredLogger,
}

impl GaugeStore {
    /// Build the estimator and restore whatever the port has for `key`
    pub fn open(
        config: EstimatorConfig,
        port: Box<dyn PersistencePort>,
        key: &str,
        save_interval: Duration,
    ) -> Self {
        let context = LogContext::new("store").with_instance(key);
        let estimator = SocEstimator::with_logger(
            config,
            get_logger_with_context(LogContext::new("estimator").with_instance(key)),
        );
        let mut store = Self {
            estimator,
            port,
            key: key.to_string(),
            save_interval,
            last_save: None,
            save_failures: 0,
            startup: StartupState::Fresh,
            logger: get_logger_with_context(context),
        };
        store.startup = store.restore();
        store
    }

    fn restore(&mut self) -> StartupState {
        let record = match self.port.load(&self.key) {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.logger.info("No stored state, starting cold");
                return StartupState::Fresh;
            }
            Err(e) => {
                self.logger
                    .warn(&format!("Failed to load stored state, starting cold: {}", e));
                return StartupState::Recovered;
            }
        };

        if let Err(e) = record.validate() {
            self.logger
                .warn(&format!("Discarding stored state, starting cold: {}", e));
            return StartupState::Recovered;
        }

        record.apply_to(&mut self.estimator);
        let out = self.estimator.outputs();
        self.logger.info(&format!(
            "Restored state: soc={} capacity={} remaining={}",
            fmt_opt(out.soc_percent, "%"),
            fmt_opt(out.capacity_mah, " mAh"),
            fmt_opt(out.q_remaining_mah, " mAh")
        ));
        StartupState::Restored
    }

    /// Feed one sample; saves when the interval has elapsed since the last save
    pub fn tick(&mut self, inputs: &SocInputs, now: Instant) -> SocOutputs {
        let outputs = self.estimator.update(inputs);
        match self.last_save {
            None => self.last_save = Some(now),
            Some(last) if now.saturating_duration_since(last) >= self.save_interval => {
                self.persist();
                self.last_save = Some(now);
            }
            Some(_) => {}
        }
        outputs
    }

    /// Write the current state through the port
    pub fn save(&mut self) -> Result<()> {
        let record = PersistedState::from_outputs(&self.estimator.outputs());
        self.port.save(&self.key, &record)
    }

    /// Save, logging instead of failing. Returns whether the save succeeded.
    pub fn persist(&mut self) -> bool {
        match self.save() {
            Ok(()) => {
                self.logger.debug("State saved");
                true
            }
            Err(e) => {
                self.save_failures += 1;
                self.logger.warn(&format!("Failed to save state: {}", e));
                false
            }
        }
    }

    pub fn force_full_anchor(&mut self) -> SocOutputs {
        self.estimator.force_full_anchor();
        self.persist();
        self.estimator.outputs()
    }

    pub fn force_empty_anchor(&mut self) -> SocOutputs {
        self.estimator.force_empty_anchor();
        self.persist();
        self.estimator.outputs()
    }

    pub fn clear_capacity(&mut self) -> SocOutputs {
        self.estimator.clear_capacity();
        self.persist();
        self.estimator.outputs()
    }

    pub fn reconfigure(&mut self, config: EstimatorConfig) {
        self.estimator.reconfigure(config);
    }

    pub fn outputs(&self) -> SocOutputs {
        self.estimator.outputs()
    }

    pub fn estimator(&self) -> &SocEstimator {
        &self.estimator
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn startup_state(&self) -> StartupState {
        self.startup
    }

    pub fn save_failures(&self) -> u64 {
        self.save_failures
    }
}

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "unknown".to_string(),
    }
}
