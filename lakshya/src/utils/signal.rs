//! Ctrl-C handling for graceful shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::error::{ApproachError, Result};

/// Flag that stays `true` until Ctrl-C is pressed.
///
/// Share it with [`ApproachThread::spawn`](crate::control::ApproachThread::spawn)
/// so the control loop exits on the next tick.
pub fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| ApproachError::Config(format!("Error setting Ctrl-C handler: {}", e)))?;
    Ok(running)
}
