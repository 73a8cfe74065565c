//! Rest detection
//!
//! A tick counts towards rest when the current is small and the rest voltage
//! is not slewing. Any other tick with real elapsed time restarts the count.

use crate::config::EstimatorConfig;

/// Slack for comparing accumulated seconds against configured thresholds
pub(crate) const TIMER_EPSILON_S: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RestDetector {
    accumulated_s: f64,
    prev_vrest_mv: Option<f64>,
    resting: bool,
}

impl RestDetector {
    /// Feed one sample and return whether rest is qualified afterwards.
    ///
    /// `current_ma` may use either sign convention. A tick with `dt_s <= 0`
    /// or without a rest voltage leaves the detector untouched.
    pub fn observe(
        &mut self,
        config: &EstimatorConfig,
        current_ma: f64,
        vrest_mv: Option<f64>,
        dt_s: f64,
    ) -> bool {
        let Some(v) = vrest_mv else {
            return self.is_qualified(config);
        };
        if !(dt_s > 0.0) {
            return self.is_qualified(config);
        }

        let dvdt = match self.prev_vrest_mv {
            Some(prev) => (v - prev).abs() / dt_s,
            None => 0.0,
        };
        self.prev_vrest_mv = Some(v);

        let candidate = current_ma.abs() <= config.rest_current_threshold_ma
            && dvdt <= config.rest_dvdt_threshold_mv_per_s;
        if candidate {
            self.accumulated_s += dt_s;
        } else {
            self.accumulated_s = 0.0;
        }
        self.resting = candidate;

        self.is_qualified(config)
    }

    /// Rest has lasted at least `rest_min_seconds`
    pub fn is_qualified(&self, config: &EstimatorConfig) -> bool {
        self.resting && self.accumulated_s + TIMER_EPSILON_S >= config.rest_min_seconds
    }

    /// Continuous rest seconds so far
    pub fn accumulated_seconds(&self) -> f64 {
        self.accumulated_s
    }

    pub fn previous_voltage_mv(&self) -> Option<f64> {
        self.prev_vrest_mv
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
