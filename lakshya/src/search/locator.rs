//! Gaze-scan object re-acquisition.
//!
//! Positions are visited strictly in order, one finder query outstanding at
//! a time. Each position must settle before the finder is asked, so the
//! scan is never parallelized.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::control::Pacer;
use crate::devices::{FinderReply, Gaze, ObjectFinder};
use crate::error::{ApproachError, Result};
use crate::types::{GazePosition, ObjectObservation};

/// Result of a gaze scan that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The finder reported the object while looking from `position`.
    Found { position: GazePosition },
    /// Every position was tried without success.
    NotFound,
    /// A stop request ended the scan early.
    Cancelled,
}

/// Sequential gaze scan over a fixed list of head positions.
#[derive(Debug, Clone)]
pub struct ObjectLocator {
    positions: Vec<GazePosition>,
    settle_delay: Duration,
    confirm_delay: Duration,
}

impl ObjectLocator {
    pub fn new(positions: Vec<GazePosition>, settle_delay: Duration, confirm_delay: Duration) -> Self {
        Self {
            positions,
            settle_delay,
            confirm_delay,
        }
    }

    pub fn positions(&self) -> &[GazePosition] {
        &self.positions
    }

    /// Look for `label` from each head position in turn.
    ///
    /// A finder that cannot be reached aborts the whole scan with
    /// [`ApproachError::Communication`]; it is not retried from the next
    /// position. A stop seen before a position, or while waiting, ends the
    /// scan with [`ScanOutcome::Cancelled`].
    pub fn reacquire(
        &self,
        label: &str,
        gaze: &mut dyn Gaze,
        finder: &mut dyn ObjectFinder,
        pacer: &mut dyn Pacer,
    ) -> Result<ScanOutcome> {
        for position in &self.positions {
            if pacer.stop_requested() {
                info!("Stopping looking for object");
                return Ok(ScanOutcome::Cancelled);
            }

            gaze.set_angular_target(position.pan_deg, position.tilt_deg);

            // Wait for the head to settle
            if pacer.pause(self.settle_delay) {
                info!("Stopping looking for object");
                return Ok(ScanOutcome::Cancelled);
            }

            match finder.query(label) {
                Ok(FinderReply::NotFound) => {
                    info!("No '{}' looking {}", label, position.name);
                }
                Ok(FinderReply::Seen(reply)) => {
                    info!("Found '{}' looking {} ({})", label, position.name, reply);
                    if pacer.pause(self.confirm_delay) {
                        return Ok(ScanOutcome::Cancelled);
                    }
                    return Ok(ScanOutcome::Found {
                        position: position.clone(),
                    });
                }
                Err(e) => {
                    error!("Unable to communicate with object finder: {}", e);
                    return Err(match e {
                        ApproachError::Communication(_) => e,
                        other => ApproachError::Communication(other.to_string()),
                    });
                }
            }
        }

        warn!("Object '{}' not found", label);
        Ok(ScanOutcome::NotFound)
    }
}

/// Pick the most confident detection carrying `label`.
///
/// Only a strictly higher confidence replaces the current best, so ties keep
/// the earliest detection. Detections with a non-finite confidence are
/// skipped.
pub fn select_best_detection<'a>(
    label: &str,
    detections: &'a [ObjectObservation],
) -> Option<&'a ObjectObservation> {
    detections
        .iter()
        .filter(|d| d.label == label && d.confidence.is_finite())
        .fold(None, |best: Option<&ObjectObservation>, d| match best {
            Some(b) if d.confidence <= b.confidence => Some(b),
            _ => Some(d),
        })
}
