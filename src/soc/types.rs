use serde::{Deserialize, Serialize};

/// One telemetry sample fed to the estimator
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocInputs {
    /// Pack current in mA, in the sensor's own sign convention
    pub current_ma: f64,
    /// Lowest cell voltage, if any cell could be read
    pub vmin_cell_mv: Option<f64>,
    /// Average cell voltage, if any cell could be read
    pub vavg_cell_mv: Option<f64>,
    /// Seconds elapsed since the previous sample
    pub dt_s: f64,
    /// Hardware overvoltage fault latched
    pub sys_overvoltage: bool,
    /// Hardware undervoltage fault latched
    pub sys_undervoltage: bool,
    /// Pack is currently delivering charge
    pub is_discharging: bool,
    /// Number of cells with their balancing bleed switched on
    pub balancing_cells: u32,
}

/// Estimator results after a tick or a manual override
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SocOutputs {
    /// State of charge in percent, `None` while unknown
    pub soc_percent: Option<f64>,
    /// Weight given to the voltage reading on this tick (0..1)
    pub soc_confidence: f64,
    /// Learned usable capacity in mAh
    pub capacity_mah: Option<f64>,
    /// Remaining charge in mAh
    pub q_remaining_mah: Option<f64>,
    /// Whether `soc_percent` may be acted upon
    pub soc_valid: bool,
    /// Whether the pack has rested long enough to trust its voltage
    pub rest_qualified: bool,
}

/// The charge bookkeeping shared by the blender, the integrator and the
/// anchors.
///
/// Invariants: `soc_percent` stays within [0, 100]; `capacity_mah` is either
/// unknown or finite and positive; `q_remaining_mah` is only known while the
/// capacity is, and then lies within [0, capacity].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChargeState {
    soc_percent: Option<f64>,
    capacity_mah: Option<f64>,
    q_remaining_mah: Option<f64>,
}

impl ChargeState {
    pub fn soc_percent(&self) -> Option<f64> {
        self.soc_percent
    }

    pub fn capacity_mah(&self) -> Option<f64> {
        self.capacity_mah
    }

    pub fn q_remaining_mah(&self) -> Option<f64> {
        self.q_remaining_mah
    }

    pub fn soc_valid(&self) -> bool {
        self.soc_percent.is_some()
    }

    /// Set the SoC directly. Non-finite values clear it.
    pub fn set_soc_percent(&mut self, soc: Option<f64>) {
        self.soc_percent = soc.filter(|s| s.is_finite()).map(|s| s.clamp(0.0, 100.0));
    }

    /// Set the capacity directly. Anything but a finite positive value makes
    /// it unknown, which also forgets the remaining charge.
    pub fn set_capacity_mah(&mut self, capacity: Option<f64>) {
        self.capacity_mah = capacity.filter(|c| c.is_finite() && *c > 0.0);
        match self.capacity_mah {
            Some(cap) => {
                self.q_remaining_mah = self.q_remaining_mah.map(|q| q.clamp(0.0, cap));
            }
            None => self.q_remaining_mah = None,
        }
    }

    /// Set the remaining charge directly; ignored while the capacity is unknown.
    pub fn set_q_remaining_mah(&mut self, q: Option<f64>) {
        self.q_remaining_mah = match (self.capacity_mah, q) {
            (Some(cap), Some(q)) if q.is_finite() => Some(q.clamp(0.0, cap)),
            _ => None,
        };
    }

    /// Fuse a voltage-derived SoC into the estimate
    pub fn blend(&mut self, ocv_soc: f64, confidence: f64) {
        let fused = match self.soc_percent {
            None => ocv_soc,
            Some(prev) => (1.0 - confidence) * prev + confidence * ocv_soc,
        };
        self.set_soc_percent(Some(fused));
        if let (Some(cap), Some(soc)) = (self.capacity_mah, self.soc_percent) {
            self.q_remaining_mah = Some(cap * soc / 100.0);
        }
    }

    /// Apply a coulomb-counted charge delta (positive = depletion)
    pub fn integrate(&mut self, delta_mah: f64) {
        let Some(cap) = self.capacity_mah else {
            return;
        };
        if self.q_remaining_mah.is_none()
            && let Some(soc) = self.soc_percent
        {
            self.q_remaining_mah = Some(cap * soc / 100.0);
        }
        if let Some(q) = self.q_remaining_mah {
            let q = (q - delta_mah).clamp(0.0, cap);
            self.q_remaining_mah = Some(q);
            self.soc_percent = Some((q / cap * 100.0).clamp(0.0, 100.0));
        }
    }

    /// Verified full: remaining charge equals capacity
    pub fn snap_full(&mut self) {
        if let Some(cap) = self.capacity_mah {
            self.q_remaining_mah = Some(cap);
        }
        self.soc_percent = Some(100.0);
    }

    /// Verified empty: nothing left
    pub fn snap_empty(&mut self) {
        if self.capacity_mah.is_some() {
            self.q_remaining_mah = Some(0.0);
        }
        self.soc_percent = Some(0.0);
    }

    /// Forget capacity, remaining charge and SoC
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
