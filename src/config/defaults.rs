use super::*;

/// Generic NMC/graphite rest curve, used until a pack-specific table is configured
fn default_ocv_table() -> Vec<OcvPoint> {
    [
        (3000.0, 0.0),
        (3300.0, 5.0),
        (3450.0, 10.0),
        (3550.0, 20.0),
        (3610.0, 30.0),
        (3660.0, 40.0),
        (3710.0, 50.0),
        (3770.0, 60.0),
        (3860.0, 70.0),
        (3950.0, 80.0),
        (4060.0, 90.0),
        (4180.0, 100.0),
    ]
    .into_iter()
    .map(|(mv, soc)| OcvPoint { mv, soc })
    .collect()
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            ocv_table: default_ocv_table(),
            rest_current_threshold_ma: 50.0,
            rest_min_seconds: 300.0,
            rest_full_weight_seconds: 1800.0,
            rest_dvdt_threshold_mv_per_s: 0.5,
            use_min_cell: true,
            full_cell_mv: 4150.0,
            full_hold_seconds: 60.0,
            empty_cell_mv: 3000.0,
            empty_hold_seconds: 10.0,
            empty_discharge_current_ma: 100.0,
            use_hw_fault_anchors: false,
            current_positive_is_discharge: true,
            coulombic_eff_discharge: 1.0,
            coulombic_eff_charge: 1.0,
            learn_alpha: 0.3,
            balance: BalanceConfig::default(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            source: None,
            dt_min_seconds: None,
            dt_max_seconds: None,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_file: Some("/data/cellgauge_state.json".to_string()),
            save_interval_seconds: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/cellgauge.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance_id: "pack0".to_string(),
            estimator: EstimatorConfig::default(),
            telemetry: TelemetryConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
            poll_interval_ms: 250,
        }
    }
}
