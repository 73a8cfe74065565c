use super::{DriverCommand, GaugeDriver};
use std::sync::Arc;

impl GaugeDriver {
    /// Apply one command. Returns `false` when the loop should stop.
    pub(crate) fn handle_command(&mut self, cmd: DriverCommand) -> bool {
        match cmd {
            DriverCommand::ForceFullAnchor => {
                self.logger.info("Command: force full anchor");
                self.store.force_full_anchor();
            }
            DriverCommand::ForceEmptyAnchor => {
                self.logger.info("Command: force empty anchor");
                self.store.force_empty_anchor();
            }
            DriverCommand::ClearCapacity => {
                self.logger.info("Command: clear capacity");
                self.store.clear_capacity();
            }
            DriverCommand::Reconfigure(estimator) => match estimator.validate() {
                Ok(()) => {
                    self.config.estimator = (*estimator).clone();
                    self.store.reconfigure(*estimator);
                    self.config_tx.send_replace(Arc::new(self.config.clone()));
                }
                Err(e) => {
                    self.logger
                        .warn(&format!("Rejected estimator reconfiguration: {}", e));
                }
            },
            DriverCommand::Shutdown => {
                self.logger.info("Shutdown requested");
                return false;
            }
        }
        self.publish_snapshot();
        true
    }
}
