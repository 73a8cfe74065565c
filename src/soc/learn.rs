//! Capacity learning from completed full-to-empty cycles

/// Result of feeding one cycle measurement to the learner
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LearnOutcome {
    /// No prior capacity; the measurement was taken as is
    Adopted { capacity_mah: f64 },
    /// Blended into the prior capacity
    Updated {
        prior_mah: f64,
        measured_mah: f64,
        capacity_mah: f64,
    },
    /// The measurement was unusable and the prior capacity was kept
    Rejected { measured_mah: f64 },
}

impl LearnOutcome {
    /// Capacity to use after this outcome
    pub fn capacity(&self, prior: Option<f64>) -> Option<f64> {
        match *self {
            Self::Adopted { capacity_mah } | Self::Updated { capacity_mah, .. } => {
                Some(capacity_mah)
            }
            Self::Rejected { .. } => prior,
        }
    }
}

/// Exponential moving average of cycle measurements
pub fn learn_capacity(prior_mah: Option<f64>, measured_mah: f64, alpha: f64) -> LearnOutcome {
    if !(measured_mah.is_finite() && measured_mah > 0.0) {
        return LearnOutcome::Rejected { measured_mah };
    }
    match prior_mah {
        Some(prior) if prior.is_finite() && prior > 0.0 => {
            let alpha = alpha.clamp(0.0, 1.0);
            LearnOutcome::Updated {
                prior_mah: prior,
                measured_mah,
                capacity_mah: (1.0 - alpha) * prior + alpha * measured_mah,
            }
        }
        _ => LearnOutcome::Adopted {
            capacity_mah: measured_mah,
        },
    }
}
