#![no_main]
use cellgauge::config::{EstimatorConfig, TelemetryConfig};
use cellgauge::telemetry::{PackReading, assemble_inputs, clamp_dt};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(reading) = serde_json::from_str::<PackReading>(text) else {
        return;
    };
    let dt = clamp_dt(reading.elapsed_s.unwrap_or(0.0), &TelemetryConfig::default());
    assert!(dt >= 0.0 && dt.is_finite());
    let _ = assemble_inputs(&reading, dt, &EstimatorConfig::default());
});
