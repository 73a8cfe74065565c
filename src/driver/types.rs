use crate::config::EstimatorConfig;
use crate::soc::SocOutputs;
use crate::store::StartupState;
use serde::Serialize;

/// Main driver state
#[derive(Debug, Clone, PartialEq)]
pub enum DriverState {
    /// Driver is initializing
    Initializing,
    /// Driver is polling telemetry
    Running,
    /// Telemetry source has no more readings
    SourceExhausted,
    /// Driver is shutting down
    ShuttingDown,
    /// Final state has been saved and the loop has exited
    Stopped,
}

impl DriverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverState::Initializing => "Initializing",
            DriverState::Running => "Running",
            DriverState::SourceExhausted => "SourceExhausted",
            DriverState::ShuttingDown => "ShuttingDown",
            DriverState::Stopped => "Stopped",
        }
    }
}

/// Commands accepted by the driver from external components (web, signals)
#[derive(Debug, Clone)]
pub enum DriverCommand {
    /// Declare the pack full and save
    ForceFullAnchor,
    /// Declare the pack empty and save
    ForceEmptyAnchor,
    /// Forget the learned capacity and save
    ClearCapacity,
    /// Replace the estimator tuning; rejected when it does not validate
    Reconfigure(Box<EstimatorConfig>),
    /// Save and stop the loop
    Shutdown,
}

/// Everything the outside world sees of the driver, published after every
/// poll and every command
#[derive(Debug, Clone, Serialize)]
pub struct GaugeSnapshot {
    pub timestamp: String,
    pub instance_id: String,
    pub driver_state: String,
    #[serde(flatten)]
    pub outputs: SocOutputs,
    /// Continuous rest seconds so far
    pub rest_seconds: f64,
    pub full_anchor_seen: bool,
    pub discharged_since_full_mah: f64,
    /// Progress of the full and empty hold timers
    pub full_hold_s: f64,
    pub empty_hold_s: f64,
    /// Last assembled sample, if any reading arrived yet
    pub vmin_cell_mv: Option<f64>,
    pub vavg_cell_mv: Option<f64>,
    pub current_ma: Option<f64>,
    pub last_dt_s: Option<f64>,
    pub balancing_cells: u32,
    pub startup_state: StartupState,
    pub total_polls: u64,
    pub read_failures: u64,
    pub save_failures: u64,
    pub poll_interval_ms: u64,
}
