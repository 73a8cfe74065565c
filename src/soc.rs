//! State-of-charge estimation
//!
//! [`SocEstimator`] fuses coulomb counting with rest-voltage readings, snaps
//! to verified full/empty anchors and learns the usable capacity from
//! completed cycles. It is synchronous and never fails: uncertainty is
//! reported through `soc_valid`.
//!
//! One [`SocEstimator::update`] call per telemetry sample runs, in order:
//! rest detection, OCV fusion, coulomb integration, anchors and learning.

pub mod anchor;
pub mod blend;
pub mod coulomb;
pub mod learn;
pub mod ocv;
pub mod rest;
mod types;

pub use anchor::{AnchorManager, AnchorReport, AnchorSample, HoldTimer};
pub use learn::LearnOutcome;
pub use rest::RestDetector;
pub use types::{ChargeState, SocInputs, SocOutputs};

use crate::config::EstimatorConfig;
use crate::logging::{StructuredLogger, get_logger};

#[derive(Debug, Clone)]
pub struct SocEstimator {
    config: EstimatorConfig,
    charge: ChargeState,
    rest: RestDetector,
    anchors: AnchorManager,
    confidence: f64,
    rest_qualified: bool,
    logger: StructuredLogger,
}

impl SocEstimator {
    /// Create an estimator with everything unknown
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            charge: ChargeState::default(),
            rest: RestDetector::default(),
            anchors: AnchorManager::default(),
            confidence: 0.0,
            rest_qualified: false,
            logger: get_logger("estimator"),
        }
    }

    /// Same as [`SocEstimator::new`] with a preconfigured logger context
    pub fn with_logger(config: EstimatorConfig, logger: StructuredLogger) -> Self {
        Self {
            logger,
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Swap the tuning; charge state, timers and the cycle in progress are kept
    pub fn reconfigure(&mut self, config: EstimatorConfig) {
        self.config = config;
        self.rest_qualified = self.rest.is_qualified(&self.config);
        self.confidence = blend::confidence(
            &self.config,
            self.rest.accumulated_seconds(),
            self.rest_qualified,
        );
        self.logger.info("Estimator reconfigured");
    }

    /// Forget everything, as on a cold start
    pub fn reset(&mut self) {
        self.charge.clear();
        self.rest.reset();
        self.anchors.reset();
        self.confidence = 0.0;
        self.rest_qualified = false;
    }

    /// Process one telemetry sample
    pub fn update(&mut self, inputs: &SocInputs) -> SocOutputs {
        let raw_current = inputs.current_ma;
        // A sample without a usable current carries no elapsed time
        let (current_ma, dt_s) = if raw_current.is_finite() && inputs.dt_s.is_finite() {
            (
                coulomb::normalize_current(&self.config, raw_current),
                inputs.dt_s.max(0.0),
            )
        } else {
            (0.0, 0.0)
        };

        let vrest_mv = if self.config.use_min_cell {
            inputs.vmin_cell_mv
        } else {
            inputs.vavg_cell_mv
        }
        .filter(|v| v.is_finite());

        self.rest_qualified = self
            .rest
            .observe(&self.config, current_ma, vrest_mv, dt_s);
        self.confidence = blend::confidence(
            &self.config,
            self.rest.accumulated_seconds(),
            self.rest_qualified,
        );

        if dt_s > 0.0
            && self.rest_qualified
            && let Some(v) = vrest_mv
            && let Some(ocv_soc) = ocv::soc_from_mv(&self.config.ocv_table, v)
        {
            self.charge.blend(ocv_soc, self.confidence);
        }

        let delta_mah = coulomb::delta_mah(&self.config, current_ma, inputs.balancing_cells, dt_s);
        self.charge.integrate(delta_mah);

        let sample = AnchorSample {
            vrest_mv,
            current_ma,
            rest_qualified: self.rest_qualified,
            dt_s,
            delta_mah,
            is_discharging: inputs.is_discharging,
            overvoltage: inputs.sys_overvoltage,
            undervoltage: inputs.sys_undervoltage,
        };
        let report = self.anchors.step(&self.config, &sample, &mut self.charge);
        self.log_report(&report, inputs);

        if tracing::enabled!(tracing::Level::TRACE) {
            self.logger.trace(&format!(
                "tick dt={:.3}s i={:.1}mA delta={:.4}mAh rest={:.1}s conf={:.3}",
                dt_s,
                current_ma,
                delta_mah,
                self.rest.accumulated_seconds(),
                self.confidence
            ));
        }

        self.outputs()
    }

    fn log_report(&self, report: &AnchorReport, inputs: &SocInputs) {
        if report.full_entered {
            let cause = if self.config.use_hw_fault_anchors && inputs.sys_overvoltage {
                "overvoltage fault"
            } else {
                "rest voltage"
            };
            self.logger
                .info(&format!("Full anchor reached ({})", cause));
        }
        if report.empty_entered && report.learned.is_none() {
            self.logger
                .debug("Empty anchor reached without a preceding full anchor; nothing to learn");
        }
        match report.learned {
            Some(LearnOutcome::Adopted { capacity_mah }) => self.logger.info(&format!(
                "Capacity learned from first complete cycle: {:.1} mAh",
                capacity_mah
            )),
            Some(LearnOutcome::Updated {
                prior_mah,
                measured_mah,
                capacity_mah,
            }) => self.logger.info(&format!(
                "Capacity updated: {:.1} -> {:.1} mAh (measured {:.1} mAh)",
                prior_mah, capacity_mah, measured_mah
            )),
            Some(LearnOutcome::Rejected { measured_mah }) => self.logger.warn(&format!(
                "Rejected cycle measurement of {:.3} mAh; capacity unchanged",
                measured_mah
            )),
            None => {}
        }
    }

    /// Current outputs without advancing time
    pub fn outputs(&self) -> SocOutputs {
        SocOutputs {
            soc_percent: self.charge.soc_percent(),
            soc_confidence: self.confidence,
            capacity_mah: self.charge.capacity_mah(),
            q_remaining_mah: self.charge.q_remaining_mah(),
            soc_valid: self.charge.soc_valid(),
            rest_qualified: self.rest_qualified,
        }
    }

    /// Declare the pack full regardless of gating
    pub fn force_full_anchor(&mut self) {
        self.anchors.mark_full();
        self.charge.snap_full();
        self.logger.info("Full anchor forced");
    }

    /// Declare the pack empty regardless of gating. The cycle in progress is
    /// abandoned, not learned from.
    pub fn force_empty_anchor(&mut self) {
        self.anchors.consume_cycle();
        self.charge.snap_empty();
        self.logger.info("Empty anchor forced");
    }

    /// Forget the learned capacity along with the charge derived from it
    pub fn clear_capacity(&mut self) {
        self.charge.clear();
        self.logger.info("Capacity cleared");
    }

    pub fn set_capacity_mah(&mut self, capacity_mah: Option<f64>) {
        self.charge.set_capacity_mah(capacity_mah);
    }

    pub fn set_soc_percent(&mut self, soc_percent: Option<f64>) {
        self.charge.set_soc_percent(soc_percent);
    }

    pub fn set_q_remaining_mah(&mut self, q_remaining_mah: Option<f64>) {
        self.charge.set_q_remaining_mah(q_remaining_mah);
    }

    pub fn full_anchor_seen(&self) -> bool {
        self.anchors.full_seen()
    }

    pub fn discharged_since_full_mah(&self) -> f64 {
        self.anchors.discharged_since_full_mah()
    }

    pub fn rest_seconds(&self) -> f64 {
        self.rest.accumulated_seconds()
    }

    pub fn anchors(&self) -> &AnchorManager {
        &self.anchors
    }
}
