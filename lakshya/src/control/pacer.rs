//! Cooperative waiting with stop checks.

use std::time::Duration;

/// Suspension point of the control loop.
///
/// Both methods must report a stop that arrived while waiting, so callers
/// can re-check before issuing any further external call.
pub trait Pacer {
    /// Wait up to `duration`. Returns `true` if a stop was requested.
    fn pause(&mut self, duration: Duration) -> bool;

    /// Check for a stop request without waiting.
    fn stop_requested(&mut self) -> bool;
}
