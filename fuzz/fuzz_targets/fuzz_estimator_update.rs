#![no_main]
use cellgauge::config::EstimatorConfig;
use cellgauge::soc::{SocEstimator, SocInputs};
use libfuzzer_sys::fuzz_target;

fn f64_at(chunk: &[u8], at: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&chunk[at..at + 8]);
    f64::from_le_bytes(buf)
}

fuzz_target!(|data: &[u8]| {
    let mut cfg = EstimatorConfig::default();
    cfg.use_hw_fault_anchors = true;
    cfg.rest_min_seconds = 1.0;
    cfg.full_hold_seconds = 1.0;
    cfg.empty_hold_seconds = 1.0;
    let mut est = SocEstimator::new(cfg);

    // 33 bytes per tick: current, vmin, vavg, dt and a flag byte
    for chunk in data.chunks_exact(33) {
        let flags = chunk[32];
        let vmin = f64_at(chunk, 8);
        let inputs = SocInputs {
            current_ma: f64_at(chunk, 0),
            vmin_cell_mv: (flags & 0x01 != 0).then_some(vmin),
            vavg_cell_mv: (flags & 0x02 != 0).then(|| f64_at(chunk, 16)),
            dt_s: f64_at(chunk, 24),
            sys_overvoltage: flags & 0x04 != 0,
            sys_undervoltage: flags & 0x08 != 0,
            is_discharging: flags & 0x10 != 0,
            balancing_cells: u32::from(flags >> 5),
        };
        if flags == 0xff {
            est.force_full_anchor();
        }
        let out = est.update(&inputs);

        assert_eq!(out.soc_valid, out.soc_percent.is_some());
        if let Some(soc) = out.soc_percent {
            assert!((0.0..=100.0).contains(&soc));
        }
        if let Some(q) = out.q_remaining_mah {
            let cap = out.capacity_mah.unwrap_or(f64::NAN);
            assert!(q >= 0.0 && q <= cap);
        }
        assert!((0.0..=1.0).contains(&out.soc_confidence));
    }
});
