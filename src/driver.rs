//! Host driver for cellgauge
//!
//! Owns the state store and a telemetry source. A single tokio task polls the
//! source on a fixed interval, feeds the estimator, applies commands from the
//! web API in between ticks and publishes a snapshot after each step. Nothing
//! else ever touches estimator state.

use crate::config::Config;
use crate::error::{GaugeError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::persistence::open_store;
use crate::soc::SocInputs;
use crate::store::GaugeStore;
use crate::telemetry::{ReplaySource, TelemetrySource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

mod commands;
mod runtime;
mod snapshot;
mod types;

pub use types::{DriverCommand, DriverState, GaugeSnapshot};

pub struct GaugeDriver {
    /// Configuration
    config: Config,

    /// Estimator plus persistence schedule
    store: GaugeStore,

    /// Where readings come from
    source: Box<dyn TelemetrySource>,

    /// Logger with context
    logger: StructuredLogger,

    /// Lifecycle state
    state: watch::Sender<DriverState>,

    /// Command receiver for external control
    commands_rx: mpsc::UnboundedReceiver<DriverCommand>,
    commands_closed: bool,

    /// Live configuration for the web API
    config_tx: watch::Sender<Arc<Config>>,

    /// Latest snapshot for the web API
    snapshot_tx: watch::Sender<Arc<GaugeSnapshot>>,
    snapshot_rx: watch::Receiver<Arc<GaugeSnapshot>>,

    /// Monotonic time of the previous poll attempt
    last_poll_at: Option<Instant>,
    last_inputs: Option<SocInputs>,
    total_polls: u64,
    read_failures: u64,
}

impl GaugeDriver {
    /// Assemble a driver from already built parts
    pub fn new(
        config: Config,
        store: GaugeStore,
        source: Box<dyn TelemetrySource>,
        commands_rx: mpsc::UnboundedReceiver<DriverCommand>,
    ) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("driver").with_instance(&config.instance_id),
        );
        let (state_tx, _) = watch::channel(DriverState::Initializing);
        let initial = Arc::new(snapshot::build(
            &config,
            &store,
            DriverState::Initializing.as_str(),
            None,
            0,
            0,
        ));
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let (config_tx, _) = watch::channel(Arc::new(config.clone()));

        Self {
            config,
            store,
            source,
            logger,
            state: state_tx,
            commands_rx,
            commands_closed: false,
            config_tx,
            snapshot_tx,
            snapshot_rx,
            last_poll_at: None,
            last_inputs: None,
            total_polls: 0,
            read_failures: 0,
        }
    }

    /// Build store and replay source from configuration
    pub async fn from_config(
        config: Config,
        commands_rx: mpsc::UnboundedReceiver<DriverCommand>,
    ) -> Result<Self> {
        let source_path = config.telemetry.source.clone().ok_or_else(|| {
            GaugeError::validation("telemetry.source", "A telemetry source is required")
        })?;
        let source = ReplaySource::open(&source_path).await?;

        let store = GaugeStore::open(
            config.estimator.clone(),
            open_store(config.persistence.state_file.as_deref()),
            &config.instance_id,
            Duration::from_secs(config.persistence.save_interval_seconds),
        );

        let driver = Self::new(config, store, Box::new(source), commands_rx);
        driver.logger.info(&format!(
            "Driver initialized with {}",
            driver.source.describe()
        ));
        Ok(driver)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Configuration as currently applied, updated after each reconfigure
    pub fn subscribe_config(&self) -> watch::Receiver<Arc<Config>> {
        self.config_tx.subscribe()
    }

    pub fn store(&self) -> &GaugeStore {
        &self.store
    }

    pub fn get_state(&self) -> DriverState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    pub fn total_polls(&self) -> u64 {
        self.total_polls
    }

    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }

    fn set_state(&self, state: DriverState) {
        self.state.send_replace(state);
    }
}
