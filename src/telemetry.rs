//! Pack telemetry: raw gauge readings and their conversion to estimator inputs
//!
//! A [`TelemetrySource`] stands in for the fuel-gauge chip. It yields one
//! [`PackReading`] per poll; [`assemble_inputs`] reduces that to the
//! [`SocInputs`] the estimator consumes.

use crate::config::{EstimatorConfig, TelemetryConfig};
use crate::error::{GaugeError, Result};
use crate::soc::{SocInputs, coulomb};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

/// One reading from the pack gauge
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackReading {
    /// Per-cell voltages in mV; `None` for a cell that could not be read
    pub cell_mv: Vec<Option<f64>>,
    /// Pack current in the sensor's sign convention
    pub current_ma: f64,
    /// Overvoltage fault latched by the gauge
    pub overvoltage: bool,
    /// Undervoltage fault latched by the gauge
    pub undervoltage: bool,
    /// Bit `n` set when cell `n` is bleeding
    pub balancing_mask: u32,
    /// Seconds covered by this reading, when the gauge reports it
    pub elapsed_s: Option<f64>,
}

impl PackReading {
    fn known_cells(&self) -> impl Iterator<Item = f64> + '_ {
        self.cell_mv.iter().filter_map(|v| *v).filter(|v| v.is_finite())
    }

    /// Lowest readable cell voltage
    pub fn min_cell_mv(&self) -> Option<f64> {
        self.known_cells().reduce(f64::min)
    }

    /// Mean of the readable cell voltages
    pub fn avg_cell_mv(&self) -> Option<f64> {
        let (sum, count) = self
            .known_cells()
            .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

/// Clamp a measured tick interval to the configured window.
///
/// Non-positive or non-finite intervals become zero and are not clamped, so
/// the first tick of a run never invents elapsed time.
pub fn clamp_dt(dt_s: f64, config: &TelemetryConfig) -> f64 {
    if !(dt_s.is_finite() && dt_s > 0.0) {
        return 0.0;
    }
    let mut dt = dt_s;
    if let Some(min) = config.dt_min_seconds {
        dt = dt.max(min);
    }
    if let Some(max) = config.dt_max_seconds {
        dt = dt.min(max);
    }
    dt
}

/// Build estimator inputs from a reading and an already clamped interval
pub fn assemble_inputs(reading: &PackReading, dt_s: f64, config: &EstimatorConfig) -> SocInputs {
    let balancing_cells = if config.balance.enabled {
        reading.balancing_mask.count_ones()
    } else {
        0
    };
    SocInputs {
        current_ma: reading.current_ma,
        vmin_cell_mv: reading.min_cell_mv(),
        vavg_cell_mv: reading.avg_cell_mv(),
        dt_s,
        sys_overvoltage: reading.overvoltage,
        sys_undervoltage: reading.undervoltage,
        is_discharging: coulomb::normalize_current(config, reading.current_ma) >= 0.0,
        balancing_cells,
    }
}

/// Something that produces pack readings
#[async_trait::async_trait]
pub trait TelemetrySource: Send {
    /// Next reading; `Ok(None)` once the source is exhausted
    async fn read(&mut self) -> Result<Option<PackReading>>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Replays JSON-lines frames, one [`PackReading`] per line
pub struct ReplaySource {
    name: String,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl ReplaySource {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|e| {
            GaugeError::telemetry(format!("Cannot open replay file {}: {}", path.display(), e))
        })?;
        Ok(Self {
            name: path.display().to_string(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

#[async_trait::async_trait]
impl TelemetrySource for ReplaySource {
    async fn read(&mut self) -> Result<Option<PackReading>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return serde_json::from_str(trimmed).map(Some).map_err(|e| {
                GaugeError::telemetry(format!("{}:{}: {}", self.name, self.line_no, e))
            });
        }
    }

    fn describe(&self) -> String {
        format!("replay {}", self.name)
    }
}

/// Hands out a fixed sequence of readings; failures can be scripted too
#[derive(Debug, Default)]
pub struct ScriptedSource {
    frames: VecDeque<Result<PackReading>>,
}

impl ScriptedSource {
    pub fn new<I: IntoIterator<Item = PackReading>>(readings: I) -> Self {
        Self {
            frames: readings.into_iter().map(Ok).collect(),
        }
    }

    /// Append a read failure
    pub fn push_error(&mut self, message: &str) {
        self.frames.push_back(Err(GaugeError::telemetry(message)));
    }

    pub fn push(&mut self, reading: PackReading) {
        self.frames.push_back(Ok(reading));
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait::async_trait]
impl TelemetrySource for ScriptedSource {
    async fn read(&mut self) -> Result<Option<PackReading>> {
        self.frames.pop_front().transpose()
    }

    fn describe(&self) -> String {
        format!("scripted ({} frames left)", self.frames.len())
    }
}
