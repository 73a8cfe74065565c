use tokio::time::{Duration, Instant, MissedTickBehavior, interval};

use super::types::DriverState;
use crate::error::Result;
use crate::telemetry::{assemble_inputs, clamp_dt};

/// Outcome of a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    /// A reading was fed to the estimator
    Updated,
    /// The read failed; no update this tick
    Skipped,
    /// The source has no more readings
    Exhausted,
}

impl super::GaugeDriver {
    /// Run the driver main loop until shutdown or the source runs dry
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info(&format!(
            "Starting driver main loop ({} ms poll interval)",
            self.config.poll_interval_ms
        ));
        self.set_state(DriverState::Running);
        self.publish_snapshot();

        let mut poll_interval = interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if self.poll_cycle().await == PollOutcome::Exhausted {
                        self.set_state(DriverState::SourceExhausted);
                        self.logger.info("Telemetry source exhausted");
                        break;
                    }
                }
                cmd = self.commands_rx.recv(), if !self.commands_closed => {
                    match cmd {
                        Some(cmd) => {
                            if !self.handle_command(cmd) {
                                break;
                            }
                        }
                        None => {
                            self.logger.debug("Command channel closed");
                            self.commands_closed = true;
                        }
                    }
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Read once from the source and feed the estimator
    pub(crate) async fn poll_cycle(&mut self) -> PollOutcome {
        let read = self.source.read().await;
        let now = Instant::now();
        // A failed read still closes the interval, so the next dt does not
        // cover the missed period.
        let since_last = self
            .last_poll_at
            .replace(now)
            .map(|prev| now.duration_since(prev).as_secs_f64());

        let reading = match read {
            Ok(Some(reading)) => reading,
            Ok(None) => return PollOutcome::Exhausted,
            Err(e) => {
                self.read_failures = self.read_failures.saturating_add(1);
                self.logger
                    .warn(&format!("Telemetry read failed, skipping tick: {}", e));
                self.publish_snapshot();
                return PollOutcome::Skipped;
            }
        };

        let measured = reading.elapsed_s.or(since_last).unwrap_or(0.0);
        let dt_s = clamp_dt(measured, &self.config.telemetry);
        let inputs = assemble_inputs(&reading, dt_s, self.store.estimator().config());
        let outputs = self.store.tick(&inputs, now.into_std());
        self.total_polls = self.total_polls.saturating_add(1);
        self.last_inputs = Some(inputs);

        self.logger.debug(&format!(
            "Poll {}: soc={:?} valid={} rest={} conf={:.2}",
            self.total_polls,
            outputs.soc_percent,
            outputs.soc_valid,
            outputs.rest_qualified,
            outputs.soc_confidence
        ));
        self.publish_snapshot();
        PollOutcome::Updated
    }

    /// Final save and state publication
    pub(crate) fn shutdown(&mut self) {
        self.set_state(DriverState::ShuttingDown);
        if self.store.persist() {
            self.logger.info("Final state saved");
        }
        self.set_state(DriverState::Stopped);
        self.publish_snapshot();
        self.logger.info("Driver stopped");
    }
}
