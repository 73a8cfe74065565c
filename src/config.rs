//! Configuration management for cellgauge
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. The estimator section is the only part the
//! SoC engine sees; everything else configures the host around it.

use crate::error::{GaugeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable that points at an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "CELLGAUGE_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stable per-pack identifier used as the persistence key
    pub instance_id: String,

    /// State-of-charge estimator tuning
    pub estimator: EstimatorConfig,

    /// Telemetry source and sample timing
    pub telemetry: TelemetryConfig,

    /// Persisted estimator state
    pub persistence: PersistenceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

/// One point of the open-circuit-voltage curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OcvPoint {
    /// Rest cell voltage in millivolts
    pub mv: f64,

    /// State of charge at that voltage, in percent
    pub soc: f64,
}

/// Balancing bleed correction for coulomb counting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BalanceConfig {
    /// Whether balancing current is charged against the pack
    pub enabled: bool,

    /// Bleed current of one balancing cell in mA
    pub current_ma_per_cell: f64,

    /// Fraction of time a balancing cell is actually bleeding (0..1)
    pub duty: f64,
}

/// State-of-charge estimator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// OCV curve, non-decreasing in voltage. Empty disables voltage fusion.
    pub ocv_table: Vec<OcvPoint>,

    /// Maximum absolute current (mA) still considered at rest
    pub rest_current_threshold_ma: f64,

    /// Seconds of continuous rest before the OCV reading is trusted at all
    pub rest_min_seconds: f64,

    /// Additional rest seconds after which the OCV reading gets full weight
    pub rest_full_weight_seconds: f64,

    /// Maximum voltage slew (mV/s) still considered at rest
    pub rest_dvdt_threshold_mv_per_s: f64,

    /// Use the lowest cell as rest voltage proxy (otherwise the cell average)
    pub use_min_cell: bool,

    /// Rest voltage at or above which the pack is considered full
    pub full_cell_mv: f64,

    /// Seconds the full condition must hold before anchoring
    pub full_hold_seconds: f64,

    /// Loaded voltage at or below which the pack is considered empty
    pub empty_cell_mv: f64,

    /// Seconds the empty condition must hold before anchoring
    pub empty_hold_seconds: f64,

    /// Minimum discharge current (mA) for the empty condition
    pub empty_discharge_current_ma: f64,

    /// Treat hardware OV/UV faults as authoritative full/empty anchors
    pub use_hw_fault_anchors: bool,

    /// Sign convention of the current sensor
    pub current_positive_is_discharge: bool,

    /// Coulombic efficiency applied to discharge current (0..1]
    pub coulombic_eff_discharge: f64,

    /// Coulombic efficiency applied to charge current (0..1]
    pub coulombic_eff_charge: f64,

    /// Weight of a new capacity measurement in the moving average (0..1)
    pub learn_alpha: f64,

    /// Balancing bleed correction
    pub balance: BalanceConfig,
}

/// Telemetry source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// JSON-lines replay file with one pack reading per line
    pub source: Option<String>,

    /// Lower clamp for the measured tick interval in seconds
    pub dt_min_seconds: Option<f64>,

    /// Upper clamp for the measured tick interval in seconds
    pub dt_max_seconds: Option<f64>,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// JSON state file; `None` keeps state in memory only
    pub state_file: Option<String>,

    /// Interval between periodic saves in seconds
    pub save_interval_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file (its directory hosts the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Whether the HTTP API is served
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl EstimatorConfig {
    /// Validate estimator tuning. Field names are reported relative to the
    /// `estimator` section.
    pub fn validate(&self) -> Result<()> {
        for (i, point) in self.ocv_table.iter().enumerate() {
            if !point.mv.is_finite() || point.mv < 0.0 {
                return Err(GaugeError::validation(
                    format!("estimator.ocv_table[{}].mv", i),
                    "must be a non-negative voltage".to_string(),
                ));
            }
            if !(0.0..=100.0).contains(&point.soc) {
                return Err(GaugeError::validation(
                    format!("estimator.ocv_table[{}].soc", i),
                    "must be within [0, 100]".to_string(),
                ));
            }
        }
        if self.ocv_table.windows(2).any(|w| w[1].mv < w[0].mv) {
            return Err(GaugeError::validation(
                "estimator.ocv_table",
                "points must not decrease in mv",
            ));
        }

        let non_negative = [
            (
                "estimator.rest_current_threshold_ma",
                self.rest_current_threshold_ma,
            ),
            ("estimator.rest_min_seconds", self.rest_min_seconds),
            (
                "estimator.rest_full_weight_seconds",
                self.rest_full_weight_seconds,
            ),
            (
                "estimator.rest_dvdt_threshold_mv_per_s",
                self.rest_dvdt_threshold_mv_per_s,
            ),
            ("estimator.full_cell_mv", self.full_cell_mv),
            ("estimator.full_hold_seconds", self.full_hold_seconds),
            ("estimator.empty_cell_mv", self.empty_cell_mv),
            ("estimator.empty_hold_seconds", self.empty_hold_seconds),
            (
                "estimator.empty_discharge_current_ma",
                self.empty_discharge_current_ma,
            ),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(GaugeError::validation(field, "must be non-negative"));
            }
        }

        for (field, value) in [
            ("estimator.coulombic_eff_discharge", self.coulombic_eff_discharge),
            ("estimator.coulombic_eff_charge", self.coulombic_eff_charge),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(GaugeError::validation(field, "must be within (0, 1]"));
            }
        }

        if !(0.0..=1.0).contains(&self.learn_alpha) {
            return Err(GaugeError::validation(
                "estimator.learn_alpha",
                "must be within [0, 1]",
            ));
        }

        if self.balance.enabled {
            if !(self.balance.current_ma_per_cell > 0.0) {
                return Err(GaugeError::validation(
                    "estimator.balance.current_ma_per_cell",
                    "required when balance correction is enabled",
                ));
            }
            if !(self.balance.duty > 0.0 && self.balance.duty <= 1.0) {
                return Err(GaugeError::validation(
                    "estimator.balance.duty",
                    "must be within (0, 1] when balance correction is enabled",
                ));
            }
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the environment override or default locations
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(path);
        }

        let default_paths = [
            "cellgauge.yaml",
            "/data/cellgauge.yaml",
            "/etc/cellgauge/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Load configuration from an explicit path when given, else as [`Config::load`]
    pub fn load_with_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::load(),
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.instance_id.trim().is_empty() {
            return Err(GaugeError::validation(
                "instance_id",
                "Instance id cannot be empty",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(GaugeError::validation(
                "poll_interval_ms",
                "Must be greater than 0",
            ));
        }

        if self.persistence.save_interval_seconds == 0 {
            return Err(GaugeError::validation(
                "persistence.save_interval_seconds",
                "Must be greater than 0",
            ));
        }

        if let Some(min) = self.telemetry.dt_min_seconds
            && !(min >= 0.0)
        {
            return Err(GaugeError::validation(
                "telemetry.dt_min_seconds",
                "Must be non-negative",
            ));
        }
        if let (Some(min), Some(max)) = (self.telemetry.dt_min_seconds, self.telemetry.dt_max_seconds)
            && max < min
        {
            return Err(GaugeError::validation(
                "telemetry.dt_max_seconds",
                "Must not be below dt_min_seconds",
            ));
        }

        if self.web.enabled && self.web.port == 0 {
            return Err(GaugeError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        self.estimator.validate()
    }
}
