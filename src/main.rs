use anyhow::Result;
use cellgauge::config::Config;
use cellgauge::driver::{DriverCommand, GaugeDriver};
use cellgauge::web::{self, AppState};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional explicit config path as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load_with_override(config_path.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    cellgauge::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "cellgauge {} starting for pack '{}'",
        env!("APP_VERSION"),
        config.instance_id
    );

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<DriverCommand>();
    let mut driver = GaugeDriver::from_config(config.clone(), cmd_rx)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create driver: {}", e))?;

    let web_task = if config.web.enabled {
        let state = AppState {
            commands_tx: cmd_tx.clone(),
            snapshot_rx: driver.subscribe_snapshot(),
            config_rx: driver.subscribe_config(),
        };
        let host = config.web.host.clone();
        let port = config.web.port;
        Some(tokio::spawn(async move {
            if let Err(e) = web::serve(state, &host, port).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Ctrl-C asks the driver to save and stop
    let signal_tx = cmd_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = signal_tx.send(DriverCommand::Shutdown);
        }
    });

    let result = driver.run().await;
    if let Some(task) = web_task {
        task.abort();
    }

    match result {
        Ok(()) => {
            info!("Driver shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Driver failed with error: {}", e);
            Err(anyhow::anyhow!("Driver error: {}", e))
        }
    }
}
