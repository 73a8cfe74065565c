//! # cellgauge - battery state-of-charge estimation
//!
//! Estimates the state of charge of a multi-cell battery pack by fusing
//! coulomb counting with rest-voltage (OCV) readings, snapping to verified
//! full and empty boundaries and learning the usable capacity from completed
//! discharge cycles.
//!
//! ## Features
//!
//! - **Estimator**: synchronous, infallible, one `update()` per sample
//! - **Capacity learning**: gated on full-to-empty cycles so partial cycles
//!   cannot corrupt the learned value
//! - **Persistence**: restart-safe state behind a small port trait
//! - **Driver**: Tokio poll loop over a telemetry source
//! - **Web Interface**: REST API and server-sent events
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `soc`: The estimator and its components
//! - `persistence`: Stored state records and storage backends
//! - `store`: Estimator ownership, restore and save schedule
//! - `telemetry`: Pack readings and their conversion to estimator inputs
//! - `driver`: Poll loop, command handling and snapshots
//! - `web`: HTTP server and REST API

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod soc;
pub mod store;
pub mod telemetry;
pub mod web;

#[cfg(test)]
mod web_tests;

// Re-export commonly used types
pub use config::Config;
pub use driver::GaugeDriver;
pub use error::{GaugeError, Result};
pub use soc::{SocEstimator, SocInputs, SocOutputs};
