//! Periodic task running the approach controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use super::{ApproachController, TickOutcome};
use crate::error::{ApproachError, Result};

/// Handle to the thread ticking an [`ApproachController`].
pub struct ApproachThread {
    handle: JoinHandle<()>,
}

impl ApproachThread {
    /// Tick `controller` once per `period` until `running` is cleared.
    ///
    /// A tick that overruns the period is followed immediately by the next.
    pub fn spawn(
        mut controller: ApproachController,
        period: Duration,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("approach".into())
            .spawn(move || {
                info!("Approach thread started ({}ms period)", period.as_millis());

                while running.load(Ordering::Relaxed) {
                    let loop_start = Instant::now();

                    match controller.tick() {
                        TickOutcome::Idle => {}
                        TickOutcome::Failed(e) => error!("Approach cycle failed: {}", e),
                        outcome => debug!("Tick finished: {:?}", outcome),
                    }

                    let elapsed = loop_start.elapsed();
                    if elapsed < period {
                        thread::sleep(period - elapsed);
                    }
                }

                info!("Approach thread shutting down");
            })
            .map_err(|e| {
                ApproachError::Config(format!("Failed to spawn approach thread: {}", e))
            })?;

        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the thread to exit. Clear `running` first.
    pub fn join(self) {
        if let Err(e) = self.handle.join() {
            error!("Approach thread panicked: {:?}", e);
        }
    }
}
