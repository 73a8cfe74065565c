use cellgauge::config::{EstimatorConfig, OcvPoint};
use cellgauge::soc::{SocEstimator, SocInputs};

fn linear_table() -> Vec<OcvPoint> {
    vec![
        OcvPoint { mv: 3300.0, soc: 0.0 },
        OcvPoint {
            mv: 4200.0,
            soc: 100.0,
        },
    ]
}

fn rest_config(rest_min_seconds: f64) -> EstimatorConfig {
    EstimatorConfig {
        ocv_table: linear_table(),
        rest_current_threshold_ma: 50.0,
        rest_min_seconds,
        rest_full_weight_seconds: 100.0,
        rest_dvdt_threshold_mv_per_s: 1.0,
        ..Default::default()
    }
}

fn at_rest(mv: f64, dt_s: f64) -> SocInputs {
    SocInputs {
        current_ma: 5.0,
        vmin_cell_mv: Some(mv),
        vavg_cell_mv: Some(mv),
        dt_s,
        ..Default::default()
    }
}

/// Small deterministic generator so the sweep is reproducible
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

#[test]
fn soc_and_remaining_stay_in_bounds() {
    let cfg = EstimatorConfig {
        ocv_table: linear_table(),
        rest_min_seconds: 5.0,
        rest_full_weight_seconds: 20.0,
        full_hold_seconds: 3.0,
        empty_hold_seconds: 3.0,
        use_hw_fault_anchors: true,
        learn_alpha: 0.5,
        ..Default::default()
    };
    let mut est = SocEstimator::new(cfg);
    let mut rng = Lcg(0x5eed);

    for step in 0..20_000 {
        if step % 997 == 0 {
            est.force_full_anchor();
        }
        let known = rng.chance(0.9);
        let v = rng.range(2800.0, 4400.0);
        let inputs = SocInputs {
            current_ma: rng.range(-6000.0, 6000.0) * if rng.chance(0.3) { 0.0 } else { 1.0 },
            vmin_cell_mv: known.then_some(v),
            vavg_cell_mv: known.then_some(v + 10.0),
            dt_s: rng.range(-0.5, 30.0),
            sys_overvoltage: rng.chance(0.01),
            sys_undervoltage: rng.chance(0.01),
            is_discharging: rng.chance(0.5),
            balancing_cells: (rng.next_f64() * 8.0) as u32,
        };
        let out = est.update(&inputs);

        assert_eq!(out.soc_valid, out.soc_percent.is_some());
        if let Some(soc) = out.soc_percent {
            assert!((0.0..=100.0).contains(&soc), "soc {} at step {}", soc, step);
        }
        if let Some(q) = out.q_remaining_mah {
            let cap = out.capacity_mah.expect("remaining charge without capacity");
            assert!(q >= 0.0 && q <= cap, "q {} cap {} at step {}", q, cap, step);
        }
        if let Some(cap) = out.capacity_mah {
            assert!(cap.is_finite() && cap > 0.0);
        }
        assert!((0.0..=1.0).contains(&out.soc_confidence));
    }
}

#[test]
fn zero_dt_twice_equals_once() {
    let mut cfg = rest_config(10.0);
    cfg.use_hw_fault_anchors = true;
    let mut est = SocEstimator::new(cfg);
    est.set_capacity_mah(Some(2000.0));
    est.set_soc_percent(Some(63.0));
    for _ in 0..4 {
        est.update(&at_rest(3800.0, 5.0));
    }

    let zero = SocInputs {
        current_ma: 1500.0,
        vmin_cell_mv: Some(3000.0),
        vavg_cell_mv: Some(3000.0),
        dt_s: 0.0,
        is_discharging: true,
        sys_undervoltage: false,
        ..Default::default()
    };
    let once = est.update(&zero);
    let twice = est.update(&zero);
    assert_eq!(once, twice);
}

#[test]
fn rest_accumulates_and_qualifies_exactly() {
    let mut est = SocEstimator::new(rest_config(10.0));
    let d = 2.5;
    for n in 1..=8 {
        let out = est.update(&at_rest(3750.0, d));
        assert!((est.rest_seconds() - n as f64 * d).abs() < 1e-9);
        assert_eq!(out.rest_qualified, n as f64 * d >= 10.0, "tick {}", n);
    }
}

#[test]
fn rest_qualified_midpoint_seeds_unknown_estimate() {
    let mut cfg = rest_config(4.0);
    cfg.rest_full_weight_seconds = 0.0;
    let mut est = SocEstimator::new(cfg);
    let mut out = est.outputs();
    for _ in 0..3 {
        out = est.update(&at_rest(3750.0, 2.0));
    }
    assert!(out.rest_qualified);
    assert!(out.soc_valid);
    assert!((out.soc_percent.unwrap() - 50.0).abs() < 0.01);
}

#[test]
fn confidence_ramps_blend_towards_ocv() {
    let cfg = rest_config(10.0);
    let mut est = SocEstimator::new(cfg);
    est.set_soc_percent(Some(20.0));

    // Qualify exactly at the minimum: zero confidence keeps the prior estimate
    for _ in 0..2 {
        est.update(&at_rest(3750.0, 5.0));
    }
    let out = est.outputs();
    assert!(out.rest_qualified);
    assert_eq!(out.soc_confidence, 0.0);
    assert_eq!(out.soc_percent, Some(20.0));

    // Fifty seconds into a hundred-second ramp
    for _ in 0..10 {
        est.update(&at_rest(3750.0, 5.0));
    }
    let out = est.outputs();
    assert!((out.soc_confidence - 0.5).abs() < 1e-9);
    let soc = out.soc_percent.unwrap();
    assert!(soc > 20.0 && soc < 50.0);
}

#[test]
fn blend_resyncs_remaining_charge_with_known_capacity() {
    let mut cfg = rest_config(2.0);
    cfg.rest_full_weight_seconds = 2.0;
    let mut est = SocEstimator::new(cfg);
    est.set_capacity_mah(Some(1000.0));
    est.set_soc_percent(Some(90.0));
    est.set_q_remaining_mah(Some(900.0));

    // Qualified with zero weight, then a full ramp on the next tick
    est.update(&at_rest(3750.0, 2.0));
    assert!((est.outputs().soc_percent.unwrap() - 90.0).abs() < 0.01);
    est.update(&at_rest(3750.0, 2.0));
    let out = est.outputs();
    assert_eq!(out.soc_confidence, 1.0);
    // 5 mA for 2 s is negligible next to the snap to the OCV reading
    assert!((out.soc_percent.unwrap() - 50.0).abs() < 0.01);
    assert!((out.q_remaining_mah.unwrap() - 500.0).abs() < 0.01);
}

#[test]
fn zero_ramp_keeps_prior_estimate() {
    let mut cfg = rest_config(10.0);
    cfg.rest_full_weight_seconds = 0.0;
    let mut est = SocEstimator::new(cfg);
    est.set_soc_percent(Some(20.0));

    for _ in 0..6 {
        est.update(&at_rest(3750.0, 5.0));
    }
    let out = est.outputs();
    assert!(out.rest_qualified);
    assert_eq!(out.soc_confidence, 0.0);
    assert_eq!(out.soc_percent, Some(20.0));
}

#[test]
fn empty_table_disables_fusion() {
    let mut cfg = rest_config(1.0);
    cfg.ocv_table.clear();
    let mut est = SocEstimator::new(cfg);
    for _ in 0..10 {
        est.update(&at_rest(3750.0, 1.0));
    }
    let out = est.outputs();
    assert!(out.rest_qualified);
    assert_eq!(out.soc_percent, None);
}

#[test]
fn unknown_voltage_keeps_rest_timer() {
    let mut est = SocEstimator::new(rest_config(10.0));
    est.update(&at_rest(3750.0, 4.0));
    est.update(&SocInputs {
        current_ma: 3000.0,
        dt_s: 4.0,
        ..Default::default()
    });
    assert!((est.rest_seconds() - 4.0).abs() < 1e-9);
}

#[test]
fn coulomb_counting_with_known_capacity() {
    let mut est = SocEstimator::new(EstimatorConfig::default());
    est.set_capacity_mah(Some(2000.0));
    est.set_soc_percent(Some(100.0));
    let out = est.update(&SocInputs {
        current_ma: 1000.0,
        vmin_cell_mv: Some(3900.0),
        vavg_cell_mv: Some(3900.0),
        dt_s: 1800.0,
        is_discharging: true,
        ..Default::default()
    });
    assert!((out.q_remaining_mah.unwrap() - 1500.0).abs() < 1e-9);
    assert!((out.soc_percent.unwrap() - 75.0).abs() < 1e-9);
}

#[test]
fn negative_sensor_convention_is_normalized() {
    let cfg = EstimatorConfig {
        current_positive_is_discharge: false,
        ..Default::default()
    };
    let mut est = SocEstimator::new(cfg);
    est.set_capacity_mah(Some(1000.0));
    est.set_soc_percent(Some(50.0));
    // Negative reading means discharge with this sensor
    let out = est.update(&SocInputs {
        current_ma: -500.0,
        dt_s: 720.0,
        is_discharging: true,
        ..Default::default()
    });
    assert!((out.q_remaining_mah.unwrap() - 400.0).abs() < 1e-9);
}

#[test]
fn overvoltage_fault_snaps_full_immediately() {
    let cfg = EstimatorConfig {
        use_hw_fault_anchors: true,
        full_hold_seconds: 600.0,
        ..Default::default()
    };
    let mut est = SocEstimator::new(cfg);
    est.set_capacity_mah(Some(2000.0));
    est.set_soc_percent(Some(40.0));

    let out = est.update(&SocInputs {
        current_ma: -2000.0,
        vmin_cell_mv: Some(3900.0),
        vavg_cell_mv: Some(3910.0),
        dt_s: 1.0,
        sys_overvoltage: true,
        ..Default::default()
    });
    assert!(!out.rest_qualified);
    assert_eq!(out.soc_percent, Some(100.0));
    assert_eq!(out.q_remaining_mah, Some(2000.0));
    assert!(est.full_anchor_seen());
}

#[test]
fn overvoltage_ignored_without_fault_anchors() {
    let mut est = SocEstimator::new(EstimatorConfig::default());
    est.set_capacity_mah(Some(2000.0));
    est.set_soc_percent(Some(40.0));
    let out = est.update(&SocInputs {
        vmin_cell_mv: Some(3900.0),
        vavg_cell_mv: Some(3900.0),
        dt_s: 1.0,
        sys_overvoltage: true,
        ..Default::default()
    });
    assert_eq!(out.soc_percent, Some(40.0));
    assert!(!est.full_anchor_seen());
}

#[test]
fn full_anchor_after_sustained_rest() {
    let cfg = EstimatorConfig {
        ocv_table: linear_table(),
        rest_min_seconds: 10.0,
        rest_full_weight_seconds: 0.0,
        full_cell_mv: 4150.0,
        full_hold_seconds: 20.0,
        ..Default::default()
    };
    let mut est = SocEstimator::new(cfg);
    est.set_capacity_mah(Some(3000.0));
    est.set_soc_percent(Some(92.0));

    let mut seen_at = None;
    for n in 1..=10 {
        est.update(&at_rest(4170.0, 5.0));
        if est.full_anchor_seen() && seen_at.is_none() {
            seen_at = Some(n);
        }
    }
    // Rest qualifies on the second tick, the hold timer starts there
    assert_eq!(seen_at, Some(5));
    let out = est.outputs();
    assert_eq!(out.soc_percent, Some(100.0));
    assert_eq!(out.q_remaining_mah, Some(3000.0));
}
