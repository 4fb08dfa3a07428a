//! Controller status shared with command producers.
//!
//! Written only by the periodic task, read by anyone holding a
//! [`ControlHandle`](crate::control::ControlHandle).

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{ApproachOutput, ObjectObservation, Pose2D};

/// Logical state of the approach controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControllerState {
    #[default]
    Idle,
    /// Resolving the object pose and driving to a standoff pose.
    Approaching,
    /// Standoff pose reached, scanning for the object.
    ReacquiringAfterSuccess,
    /// No reachable standoff pose left, scanning from where the robot is.
    ReacquiringAfterAbort,
    /// A stop request ended the current activity.
    Stopped,
    /// Scanning for the last object without a prior approach.
    ResumingSearch,
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Idle => "IDLE",
            ControllerState::Approaching => "APPROACHING",
            ControllerState::ReacquiringAfterSuccess => "REACQUIRING_AFTER_SUCCESS",
            ControllerState::ReacquiringAfterAbort => "REACQUIRING_AFTER_ABORT",
            ControllerState::Stopped => "STOPPED",
            ControllerState::ResumingSearch => "RESUMING_SEARCH",
        }
    }

    /// Whether an approach or scan is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, ControllerState::Idle | ControllerState::Stopped)
    }
}

/// Controller progress, readable from any thread.
#[derive(Debug, Default)]
pub struct SharedStatus {
    state: RwLock<ControllerState>,
    object: RwLock<Option<ObjectObservation>>,
    last_target: RwLock<Option<Pose2D>>,
    last_output: RwLock<Option<ApproachOutput>>,
    goals_sent: AtomicU32,
    cycles_completed: AtomicU32,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControllerState {
        *self.state.read()
    }

    pub fn set_state(&self, state: ControllerState) {
        *self.state.write() = state;
    }

    /// Object the controller is currently working on.
    pub fn object(&self) -> Option<ObjectObservation> {
        self.object.read().clone()
    }

    pub fn set_object(&self, object: ObjectObservation) {
        *self.object.write() = Some(object);
    }

    /// Last standoff pose sent to navigation.
    pub fn last_target(&self) -> Option<Pose2D> {
        self.last_target.read().clone()
    }

    /// Record a goal sent to navigation.
    pub fn record_goal(&self, target: Pose2D) {
        *self.last_target.write() = Some(target);
        self.goals_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_output(&self) -> Option<ApproachOutput> {
        self.last_output.read().clone()
    }

    pub fn record_output(&self, output: ApproachOutput) {
        *self.last_output.write() = Some(output);
    }

    pub fn goals_sent(&self) -> u32 {
        self.goals_sent.load(Ordering::Relaxed)
    }

    pub fn increment_cycles(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Approach cycles that ran to completion, successful or not.
    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed.load(Ordering::Relaxed)
    }
}
