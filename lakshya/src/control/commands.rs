//! Control input for the approach controller.
//!
//! Commands travel over a crossbeam channel from any number of
//! [`ControlHandle`]s to the single [`CommandInbox`] owned by the periodic
//! task. The inbox latches them into [`ControlFlags`]; nothing else crosses
//! execution contexts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{info, warn};

use super::Pacer;
use crate::error::{ApproachError, Result};
use crate::status::{ControllerState, SharedStatus};
use crate::types::{ObjectObservation, Pose2D};

/// Commands accepted by the approach controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Approach the given object.
    Start(ObjectObservation),
    /// Stop whatever is in progress.
    Stop,
    /// Look for the last object again and approach it if found.
    Resume,
}

impl ControlCommand {
    /// Parse a text command.
    ///
    /// ```text
    /// start <label> <u> <v>        pixel in the depth image
    /// start <label> <x> <y> <z>    absolute world position
    /// stop
    /// resume
    /// ```
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("start") => {
                let label = tokens.next().ok_or_else(|| {
                    ApproachError::InvalidObservation("missing object label".to_string())
                })?;
                let values = tokens
                    .map(|t| {
                        t.parse::<f64>().map_err(|_| {
                            ApproachError::InvalidObservation(format!("bad coordinate '{}'", t))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()?;
                Ok(ControlCommand::Start(ObjectObservation::from_values(
                    label, &values,
                )?))
            }
            Some("stop") => Ok(ControlCommand::Stop),
            Some("resume") => Ok(ControlCommand::Resume),
            Some(other) => Err(ApproachError::InvalidObservation(format!(
                "unknown command '{}'",
                other
            ))),
            None => Err(ApproachError::InvalidObservation("empty command".to_string())),
        }
    }
}

/// One-shot requests latched for the current tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlags {
    pub start_requested: bool,
    pub stop_requested: bool,
    pub resume_requested: bool,
}

/// Producer side: cloneable, usable from any thread.
#[derive(Clone)]
pub struct ControlHandle {
    tx: Sender<ControlCommand>,
    status: Arc<SharedStatus>,
}

impl ControlHandle {
    /// Validate a raw start command and queue it.
    ///
    /// Malformed observations are rejected here and never reach the
    /// controller.
    pub fn start(&self, label: &str, values: &[f64]) -> Result<()> {
        let observation = ObjectObservation::from_values(label, values)?;
        self.send(ControlCommand::Start(observation))
    }

    pub fn stop(&self) -> Result<()> {
        self.send(ControlCommand::Stop)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(ControlCommand::Resume)
    }

    pub fn send(&self, command: ControlCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| {
            ApproachError::Communication("approach controller not running (channel closed)".into())
        })
    }

    pub fn state(&self) -> ControllerState {
        self.status.state()
    }

    /// Object of the current or last approach.
    pub fn object(&self) -> Option<ObjectObservation> {
        self.status.object()
    }

    pub fn last_target(&self) -> Option<Pose2D> {
        self.status.last_target()
    }

    pub fn status(&self) -> &Arc<SharedStatus> {
        &self.status
    }
}

/// Consumer side, owned by the periodic task.
pub struct CommandInbox {
    rx: Receiver<ControlCommand>,
    flags: ControlFlags,
    pending: Option<ObjectObservation>,
    chained: bool,
    deferred_resume: bool,
    busy: bool,
    status: Arc<SharedStatus>,
}

impl CommandInbox {
    pub fn flags(&self) -> ControlFlags {
        self.flags
    }

    pub fn status(&self) -> &Arc<SharedStatus> {
        &self.status
    }

    /// Latch every queued command without blocking.
    pub fn drain(&mut self) {
        while let Ok(command) = self.rx.try_recv() {
            self.latch(command);
        }
    }

    /// Take the observation of a pending start request.
    pub fn take_start(&mut self) -> Option<ObjectObservation> {
        self.pending.take()
    }

    /// Queue a start from inside the controller (resume found the object).
    pub fn chain_start(&mut self, observation: ObjectObservation) {
        self.pending = Some(observation);
        self.flags.start_requested = true;
        self.chained = true;
    }

    /// While busy, start requests are dropped, a stop holds until the end of
    /// the tick and a resume waits for the next tick.
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Clear the one-shot flags at the end of a tick.
    ///
    /// A start survives only when it was chained from a resume in this tick.
    /// A resume deferred during the tick is latched for the next one.
    pub fn clear(&mut self) {
        if !self.chained {
            self.flags.start_requested = false;
            self.pending = None;
        }
        self.chained = false;
        self.flags.stop_requested = false;
        self.flags.resume_requested = std::mem::take(&mut self.deferred_resume);
        self.busy = false;
    }

    fn latch(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Start(observation) => {
                if self.busy || self.flags.start_requested {
                    warn!(
                        "Ignoring start for '{}': approach already in progress",
                        observation.label
                    );
                    return;
                }
                info!("Start requested for '{}'", observation.label);
                self.pending = Some(observation);
                self.flags.start_requested = true;
            }
            ControlCommand::Stop => {
                info!("Stopping approaching actions");
                self.flags.stop_requested = true;
            }
            ControlCommand::Resume => {
                if self.busy {
                    info!("Resume deferred until the current cycle ends");
                    self.deferred_resume = true;
                    return;
                }
                info!("Resuming approaching actions");
                self.flags.stop_requested = false;
                self.flags.resume_requested = true;
            }
        }
    }
}

impl Pacer for CommandInbox {
    fn pause(&mut self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        while !self.flags.stop_requested {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(command) => self.latch(command),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    // No producers left; nothing can interrupt the wait
                    std::thread::sleep(remaining);
                    break;
                }
            }
        }
        self.stop_requested()
    }

    fn stop_requested(&mut self) -> bool {
        self.drain();
        self.flags.stop_requested
    }
}

/// Create a connected handle/inbox pair sharing one status block.
pub fn create_control_channel() -> (ControlHandle, CommandInbox) {
    let (tx, rx) = unbounded();
    let status = Arc::new(SharedStatus::new());
    (
        ControlHandle {
            tx,
            status: Arc::clone(&status),
        },
        CommandInbox {
            rx,
            flags: ControlFlags::default(),
            pending: None,
            chained: false,
            deferred_resume: false,
            busy: false,
            status,
        },
    )
}
