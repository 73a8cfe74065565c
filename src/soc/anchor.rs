//! Full/empty anchor detection and the learning gate
//!
//! Capacity is only learned from a discharge bounded by a verified full
//! anchor on one end and a verified empty anchor on the other. Partial
//! cycles never reach the learner.

use super::learn::{LearnOutcome, learn_capacity};
use super::rest::TIMER_EPSILON_S;
use super::types::ChargeState;
use crate::config::EstimatorConfig;

/// Tracks how long a boundary condition has held
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoldTimer {
    elapsed_s: f64,
}

impl HoldTimer {
    /// Advance the timer and report whether it qualifies on this tick.
    ///
    /// `condition` is `None` when the tick carries no evidence either way
    /// (rest voltage unknown); the timer is then left alone. Ticks with
    /// `dt_s <= 0` freeze the timer. A forced timer jumps to its threshold.
    pub fn observe(
        &mut self,
        condition: Option<bool>,
        dt_s: f64,
        threshold_s: f64,
        forced: bool,
    ) -> bool {
        if dt_s > 0.0 {
            match condition {
                Some(true) => self.elapsed_s += dt_s,
                Some(false) => self.elapsed_s = 0.0,
                None => {}
            }
        }
        if forced {
            self.elapsed_s = self.elapsed_s.max(threshold_s);
            return true;
        }
        condition == Some(true) && self.elapsed_s + TIMER_EPSILON_S >= threshold_s
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_s
    }
}

/// Per-tick values the anchor manager needs
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorSample {
    pub vrest_mv: Option<f64>,
    /// Pack current, positive = discharge
    pub current_ma: f64,
    pub rest_qualified: bool,
    pub dt_s: f64,
    pub delta_mah: f64,
    pub is_discharging: bool,
    pub overvoltage: bool,
    pub undervoltage: bool,
}

/// What happened at the boundaries on one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnchorReport {
    pub full: bool,
    /// Full anchor qualified on this tick but not on the previous one
    pub full_entered: bool,
    pub empty: bool,
    pub empty_entered: bool,
    /// Set when a completed cycle was consumed on this tick
    pub learned: Option<LearnOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnchorManager {
    full_hold: HoldTimer,
    empty_hold: HoldTimer,
    full_seen: bool,
    discharged_since_full_mah: f64,
    full_active: bool,
    empty_active: bool,
}

impl AnchorManager {
    pub fn step(
        &mut self,
        config: &EstimatorConfig,
        sample: &AnchorSample,
        charge: &mut ChargeState,
    ) -> AnchorReport {
        let mut report = AnchorReport::default();

        let full_condition = sample
            .vrest_mv
            .map(|v| sample.rest_qualified && v >= config.full_cell_mv);
        let full_forced = config.use_hw_fault_anchors && sample.overvoltage;
        report.full = self.full_hold.observe(
            full_condition,
            sample.dt_s,
            config.full_hold_seconds,
            full_forced,
        );
        if report.full {
            self.mark_full();
            if charge.capacity_mah().is_some() {
                charge.snap_full();
            }
        }
        report.full_entered = report.full && !self.full_active;
        self.full_active = report.full;

        let empty_condition = sample.vrest_mv.map(|v| {
            sample.current_ma >= config.empty_discharge_current_ma && v <= config.empty_cell_mv
        });
        let empty_forced = config.use_hw_fault_anchors && sample.undervoltage;
        report.empty = self.empty_hold.observe(
            empty_condition,
            sample.dt_s,
            config.empty_hold_seconds,
            empty_forced,
        );
        report.empty_entered = report.empty && !self.empty_active;
        self.empty_active = report.empty;

        if sample.is_discharging && sample.delta_mah > 0.0 {
            self.discharged_since_full_mah += sample.delta_mah;
        }

        if report.empty && self.full_seen {
            let prior = charge.capacity_mah();
            let outcome = learn_capacity(prior, self.discharged_since_full_mah, config.learn_alpha);
            charge.set_capacity_mah(outcome.capacity(prior));
            charge.snap_empty();
            self.full_seen = false;
            report.learned = Some(outcome);
        }

        report
    }

    /// Record a full anchor: the next cycle measurement starts here
    pub fn mark_full(&mut self) {
        self.full_seen = true;
        self.discharged_since_full_mah = 0.0;
    }

    /// Abandon the cycle in progress without learning from it
    pub fn consume_cycle(&mut self) {
        self.full_seen = false;
    }

    pub fn full_seen(&self) -> bool {
        self.full_seen
    }

    pub fn discharged_since_full_mah(&self) -> f64 {
        self.discharged_since_full_mah
    }

    pub fn full_hold(&self) -> &HoldTimer {
        &self.full_hold
    }

    pub fn empty_hold(&self) -> &HoldTimer {
        &self.empty_hold
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
