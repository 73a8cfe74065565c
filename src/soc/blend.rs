//! Rest-duration confidence weighting

use crate::config::EstimatorConfig;

/// Weight of the OCV reading for a given rest duration.
///
/// Zero until rest qualifies, then ramps linearly over
/// `rest_full_weight_seconds` up to one. Without a ramp the weight stays at
/// zero, so a qualified rest only seeds an estimate that is still unknown.
pub fn confidence(config: &EstimatorConfig, accumulated_s: f64, qualified: bool) -> f64 {
    if !qualified {
        return 0.0;
    }
    if config.rest_full_weight_seconds <= 0.0 {
        return 0.0;
    }
    ((accumulated_s - config.rest_min_seconds) / config.rest_full_weight_seconds).clamp(0.0, 1.0)
}
