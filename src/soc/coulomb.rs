//! Coulomb counting with efficiency and balancing corrections

use crate::config::EstimatorConfig;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Convert a raw sensor reading to "positive = discharge"
pub fn normalize_current(config: &EstimatorConfig, raw_ma: f64) -> f64 {
    if config.current_positive_is_discharge {
        raw_ma
    } else {
        -raw_ma
    }
}

/// Extra discharge drawn by balancing bleed resistors, in mA
pub fn balancing_current_ma(config: &EstimatorConfig, balancing_cells: u32) -> f64 {
    let balance = &config.balance;
    if balance.enabled && balance.current_ma_per_cell > 0.0 && balance.duty > 0.0 {
        balancing_cells as f64 * balance.current_ma_per_cell * balance.duty
    } else {
        0.0
    }
}

/// Effective depletion current for a normalized pack current
pub fn effective_current_ma(config: &EstimatorConfig, current_ma: f64, balancing_cells: u32) -> f64 {
    let scaled = if current_ma >= 0.0 {
        if config.coulombic_eff_discharge > 0.0 {
            current_ma / config.coulombic_eff_discharge
        } else {
            current_ma
        }
    } else {
        current_ma * config.coulombic_eff_charge
    };
    scaled + balancing_current_ma(config, balancing_cells)
}

/// Charge removed from the pack over `dt_s`, in mAh (negative while charging)
pub fn delta_mah(config: &EstimatorConfig, current_ma: f64, balancing_cells: u32, dt_s: f64) -> f64 {
    if !(dt_s > 0.0) {
        return 0.0;
    }
    effective_current_ma(config, current_ma, balancing_cells) * dt_s / SECONDS_PER_HOUR
}
