use super::types::GaugeSnapshot;
use crate::config::Config;
use crate::soc::SocInputs;
use crate::store::GaugeStore;
use std::sync::Arc;

pub(super) fn build(
    config: &Config,
    store: &GaugeStore,
    driver_state: &str,
    last_inputs: Option<&SocInputs>,
    total_polls: u64,
    read_failures: u64,
) -> GaugeSnapshot {
    let estimator = store.estimator();
    GaugeSnapshot {
        timestamp: chrono::Utc::now().to_rfc3339(),
        instance_id: config.instance_id.clone(),
        driver_state: driver_state.to_string(),
        outputs: estimator.outputs(),
        rest_seconds: estimator.rest_seconds(),
        full_anchor_seen: estimator.full_anchor_seen(),
        discharged_since_full_mah: estimator.discharged_since_full_mah(),
        full_hold_s: estimator.anchors().full_hold().elapsed_seconds(),
        empty_hold_s: estimator.anchors().empty_hold().elapsed_seconds(),
        vmin_cell_mv: last_inputs.and_then(|i| i.vmin_cell_mv),
        vavg_cell_mv: last_inputs.and_then(|i| i.vavg_cell_mv),
        current_ma: last_inputs.map(|i| i.current_ma),
        last_dt_s: last_inputs.map(|i| i.dt_s),
        balancing_cells: last_inputs.map_or(0, |i| i.balancing_cells),
        startup_state: store.startup_state(),
        total_polls,
        read_failures,
        save_failures: store.save_failures(),
        poll_interval_ms: config.poll_interval_ms,
    }
}

impl super::GaugeDriver {
    pub fn subscribe_snapshot(&self) -> tokio::sync::watch::Receiver<Arc<GaugeSnapshot>> {
        self.snapshot_rx.clone()
    }

    pub fn snapshot(&self) -> Arc<GaugeSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    pub(super) fn publish_snapshot(&self) {
        let snap = build(
            &self.config,
            &self.store,
            self.get_state().as_str(),
            self.last_inputs.as_ref(),
            self.total_polls,
            self.read_failures,
        );
        self.snapshot_tx.send_replace(Arc::new(snap));
    }
}
